use chorely_shared::api::{self, rest};
use chrono::DateTime;

use crate::CliError;
use crate::cli::{ChoreEditArgs, ChoresCommand, PointsCommand, RewardsCommand};
use crate::session::Session;

/// Renders an RFC 3339 timestamp as a calendar day, or the input if it does not parse.
pub fn short_date(rfc3339: &str) -> String {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| rfc3339.to_string())
}

fn print_chore_row(c: &api::ChoreDto) {
    let due = c.due_date.as_deref().map(short_date).unwrap_or_else(|| "-".into());
    println!(
        "{:<36}  {:<9}  {:>6}  {:<10}  {:<16}  {}",
        c.id, c.status.as_str(), c.template.base_points, due, c.assigned_to.name, c.template.title
    );
}

fn print_chores(chores: &[api::ChoreDto]) {
    if chores.is_empty() {
        println!("No chores");
        return;
    }
    println!(
        "{:<36}  {:<9}  {:>6}  {:<10}  {:<16}  TITLE",
        "ID", "STATUS", "POINTS", "DUE", "ASSIGNEE"
    );
    for c in chores {
        print_chore_row(c);
    }
}

fn print_reward(r: &api::RewardDto) {
    println!(
        "{:<36}  {:>6}  {:>8}  {}",
        r.id, r.points_required, r.redeemed_count, r.title
    );
}

fn print_members(members: &[api::MemberDto]) {
    println!("{:<36}  {:<6}  {:>6}  NAME", "ID", "ROLE", "POINTS");
    for m in members {
        println!("{:<36}  {:<6}  {:>6}  {}", m.id, m.role.as_str(), m.points, m.name);
    }
}

pub async fn whoami(s: &Session) -> Result<(), CliError> {
    let me = rest::me(&s.server_url, &s.token).await?;
    println!("{} <{}>", me.name, me.email);
    println!("  id:     {}", me.id);
    println!("  role:   {}", me.role);
    println!("  points: {}", me.points);
    println!("  family: {} ({})", me.family.name, me.family.id);
    if s.is_parent() {
        println!("  invite code: {}", me.family.invite_code);
    }
    Ok(())
}

fn edit_request(fields: ChoreEditArgs) -> api::UpdateChoreReq {
    let due_date = if fields.clear_due {
        Some(String::new())
    } else {
        fields.due
    };
    api::UpdateChoreReq {
        title: fields.title,
        description: fields.description,
        base_points: fields.points,
        frequency: fields.frequency.map(Into::into),
        assigned_to_id: fields.assignee,
        due_date,
    }
}

pub async fn chores(s: &Session, cmd: ChoresCommand) -> Result<(), CliError> {
    let (base, fam, tok) = (s.server_url.as_str(), s.family_id(), s.token.as_str());
    match cmd {
        ChoresCommand::List {
            status,
            assignee,
            from,
            to,
        } => {
            let query = api::ChoreListQuery {
                status: status.map(Into::into),
                assigned_to_id: assignee,
                from,
                to,
            };
            print_chores(&rest::list_chores(base, fam, tok, &query).await?);
        }
        ChoresCommand::Add {
            title,
            points,
            assignee,
            description,
            due,
            frequency,
        } => {
            let body = api::CreateChoreReq {
                title,
                description,
                base_points: points,
                assigned_to_id: assignee,
                due_date: due,
                frequency: frequency.map(Into::into),
            };
            let chore = rest::create_chore(base, fam, tok, &body).await?;
            println!("Created chore {}", chore.id);
        }
        ChoresCommand::Show { id } => {
            let detail = rest::get_chore(base, fam, &id, tok).await?;
            let c = &detail.chore;
            println!("{} [{}]", c.template.title, c.status);
            if let Some(desc) = &c.template.description {
                println!("  {desc}");
            }
            println!("  points:    {}", c.template.base_points);
            println!("  frequency: {}", c.template.frequency);
            println!("  assignee:  {} ({})", c.assigned_to.name, c.assigned_to_id);
            if let Some(due) = &c.due_date {
                println!("  due:       {}", short_date(due));
            }
            for log in &detail.completions {
                match (&log.approved_by_id, &log.approved_at) {
                    (Some(by), Some(at)) => println!(
                        "  done {} / approved {} by {}",
                        short_date(&log.submitted_at),
                        short_date(at),
                        by
                    ),
                    _ => println!("  done {} / awaiting approval", short_date(&log.submitted_at)),
                }
            }
        }
        ChoresCommand::Edit { id, fields } => {
            let chore = rest::update_chore(base, fam, &id, tok, &edit_request(fields)).await?;
            print_chores(std::slice::from_ref(&chore));
        }
        ChoresCommand::Delete { id } => {
            rest::delete_chore(base, fam, &id, tok).await?;
            println!("Deleted chore {id}");
        }
        ChoresCommand::Complete { id } => {
            let chore = rest::complete_chore(base, fam, &id, tok).await?;
            println!("Marked '{}' as done; waiting for approval", chore.template.title);
        }
        ChoresCommand::Approve { id } => {
            let resp = rest::approve_chore(base, fam, &id, tok).await?;
            println!(
                "Approved '{}': +{} points for {} (balance {})",
                resp.chore.template.title,
                resp.points_awarded,
                resp.chore.assigned_to.name,
                resp.balance
            );
        }
    }
    Ok(())
}

pub async fn rewards(s: &Session, cmd: RewardsCommand) -> Result<(), CliError> {
    let (base, fam, tok) = (s.server_url.as_str(), s.family_id(), s.token.as_str());
    match cmd {
        RewardsCommand::List => {
            let rewards = rest::list_rewards(base, fam, tok).await?;
            if rewards.is_empty() {
                println!("No rewards");
                return Ok(());
            }
            println!("{:<36}  {:>6}  {:>8}  TITLE", "ID", "COST", "REDEEMED");
            for r in &rewards {
                print_reward(r);
            }
        }
        RewardsCommand::Add { title, points } => {
            let body = api::CreateRewardReq {
                title,
                points_required: points,
            };
            let reward = rest::create_reward(base, fam, tok, &body).await?;
            println!("Created reward {}", reward.id);
        }
        RewardsCommand::Edit { id, title, points } => {
            let body = api::UpdateRewardReq {
                title,
                points_required: points,
            };
            print_reward(&rest::update_reward(base, fam, &id, tok, &body).await?);
        }
        RewardsCommand::Delete { id } => {
            rest::delete_reward(base, fam, &id, tok).await?;
            println!("Deactivated reward {id}");
        }
        RewardsCommand::Redeem { id } => {
            let resp = rest::redeem_reward(base, fam, &id, tok).await?;
            println!(
                "Redeemed '{}' for {} points (balance {})",
                resp.reward.title, resp.points_spent, resp.balance
            );
        }
    }
    Ok(())
}

pub async fn members(s: &Session) -> Result<(), CliError> {
    let members = rest::list_members(&s.server_url, s.family_id(), &s.token).await?;
    print_members(&members);
    Ok(())
}

pub async fn points(s: &Session, cmd: PointsCommand) -> Result<(), CliError> {
    let (base, fam, tok) = (s.server_url.as_str(), s.family_id(), s.token.as_str());
    match cmd {
        PointsCommand::Adjust {
            user,
            delta,
            reason,
        } => {
            let body = api::PointsAdjustReq {
                points: delta,
                reason,
            };
            let balance = rest::adjust_points(base, fam, &user, tok, &body).await?;
            println!("Balance of {} is now {}", balance.user_id, balance.points);
        }
        PointsCommand::History {
            user,
            page,
            per_page,
        } => {
            let user = user.unwrap_or_else(|| s.user_id().to_string());
            let page = api::PageQuery { page, per_page };
            let entries = rest::points_history(base, fam, &user, tok, &page).await?;
            if entries.is_empty() {
                println!("No entries");
                return Ok(());
            }
            println!("{:<10}  {:>7}  {:>7}  {:<10}  NOTE", "DATE", "DELTA", "BALANCE", "REASON");
            for e in &entries {
                println!(
                    "{:<10}  {:>+7}  {:>7}  {:<10}  {}",
                    short_date(&e.time),
                    e.delta,
                    e.balance_after,
                    e.reason.as_str(),
                    e.note.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

pub async fn dashboard(s: &Session) -> Result<(), CliError> {
    match rest::dashboard(&s.server_url, s.family_id(), &s.token).await? {
        api::DashboardDto::Parent {
            pending,
            awaiting_approval,
            members,
        } => {
            println!("Pending chores:     {pending}");
            println!("Awaiting approval:  {awaiting_approval}");
            println!();
            print_members(&members);
        }
        api::DashboardDto::Child {
            points,
            open_chores,
        } => {
            println!("Points: {points}");
            println!();
            print_chores(&open_chores);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_date_keeps_the_day() {
        assert_eq!(short_date("2030-06-20T00:00:00+00:00"), "2030-06-20");
        assert_eq!(short_date("not a date"), "not a date");
    }

    #[test]
    fn clear_due_sends_empty_string() {
        let req = edit_request(ChoreEditArgs {
            title: None,
            description: None,
            points: Some(3),
            assignee: None,
            due: None,
            clear_due: true,
            frequency: None,
        });
        assert_eq!(req.due_date.as_deref(), Some(""));
        assert_eq!(req.base_points, Some(3));

        let req = edit_request(ChoreEditArgs {
            title: None,
            description: None,
            points: None,
            assignee: None,
            due: Some("2030-01-01".into()),
            clear_due: false,
            frequency: None,
        });
        assert_eq!(req.due_date.as_deref(), Some("2030-01-01"));
    }
}
