use chorely_server::storage::{
    ChoreFilter, ChoreUpdate, FamilyMembership, MAX_BALANCE, NewAccount, NewChore, RewardUpdate,
    Store, StorageError,
};
use chorely_shared::auth::Role;
use chorely_shared::domain::{ChoreStatus, Frequency, parse_due_date};
use chrono::{Duration, Utc};

async fn store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let store = Store::connect_sqlite(path.to_str().unwrap()).await.unwrap();
    (store, dir)
}

fn account(email: &str, role: Role, membership: FamilyMembership) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        name: email.split('@').next().unwrap().to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role,
        membership,
    }
}

/// Parent and child ids of a fresh family.
async fn family(store: &Store) -> (String, String, String) {
    let parent = store
        .register_user(account(
            "mom@example.com",
            Role::Parent,
            FamilyMembership::Create {
                name: "Smiths".into(),
            },
        ))
        .await
        .unwrap();
    let child = store
        .register_user(account(
            "kid@example.com",
            Role::Child,
            FamilyMembership::Join {
                invite_code: parent.family_id.clone(),
            },
        ))
        .await
        .unwrap();
    (parent.family_id, parent.id, child.id)
}

fn chore(family_id: &str, assignee: &str, points: i32, due: Option<&str>) -> NewChore {
    NewChore {
        family_id: family_id.to_string(),
        title: format!("chore worth {points}"),
        description: None,
        base_points: points,
        frequency: Frequency::OneTime,
        assigned_to_id: assignee.to_string(),
        due_date: due.map(|d| parse_due_date(d).unwrap()),
    }
}

#[tokio::test]
async fn registration_creates_or_joins_family() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;

    let fam = store.get_family(&family_id).await.unwrap().unwrap();
    assert_eq!(fam.name, "Smiths");
    assert_eq!(fam.created_by, parent_id);

    let child = store.get_user(&child_id).await.unwrap().unwrap();
    assert_eq!(child.family_id, family_id);
    assert_eq!(child.role, "child");
    assert_eq!(child.points, 0);

    let found = store
        .find_user_by_email("mom@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, parent_id);
    assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());

    let members = store.list_family_members(&family_id).await.unwrap();
    let roles: Vec<&str> = members.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["parent", "child"]);

    let dup = store
        .register_user(account(
            "mom@example.com",
            Role::Parent,
            FamilyMembership::Create {
                name: "Again".into(),
            },
        ))
        .await;
    assert!(matches!(dup, Err(StorageError::Conflict(_))));

    let bad = store
        .register_user(account(
            "stray@example.com",
            Role::Child,
            FamilyMembership::Join {
                invite_code: "missing".into(),
            },
        ))
        .await;
    assert!(matches!(bad, Err(StorageError::InvalidInput(_))));
}

#[tokio::test]
async fn approval_credits_points_once() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;
    let (assignment, _, _) = store
        .create_chore(chore(&family_id, &child_id, 12, None))
        .await
        .unwrap();

    let early = store.approve_chore(&assignment.id, &parent_id).await;
    assert!(matches!(early, Err(StorageError::Conflict(_))));

    let (done, _, _) = store.complete_chore(&assignment.id, &child_id).await.unwrap();
    assert_eq!(done.status, ChoreStatus::Completed.as_str());
    let again = store.complete_chore(&assignment.id, &child_id).await;
    assert!(matches!(again, Err(StorageError::Conflict(_))));

    let outcome = store.approve_chore(&assignment.id, &parent_id).await.unwrap();
    assert_eq!(outcome.points_awarded, 12);
    assert_eq!(outcome.balance, 12);
    assert_eq!(outcome.chore.0.status, ChoreStatus::Approved.as_str());

    let twice = store.approve_chore(&assignment.id, &parent_id).await;
    assert!(matches!(twice, Err(StorageError::Conflict(_))));
    assert_eq!(store.get_user(&child_id).await.unwrap().unwrap().points, 12);

    let logs = store.list_completion_logs(&assignment.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].approved_by_id.as_deref(), Some(parent_id.as_str()));

    let ledger = store.list_point_transactions(&child_id, 1, 10).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].reason, "approval");
    assert_eq!(ledger[0].reference_id.as_deref(), Some(assignment.id.as_str()));

    let missing = store.complete_chore("missing", &child_id).await;
    assert!(matches!(missing, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn chores_filter_and_order() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;
    let undated = store
        .create_chore(chore(&family_id, &child_id, 1, None))
        .await
        .unwrap()
        .0
        .id;
    let late = store
        .create_chore(chore(&family_id, &parent_id, 2, Some("2031-02-01")))
        .await
        .unwrap()
        .0
        .id;
    let early = store
        .create_chore(chore(&family_id, &child_id, 3, Some("2031-01-01")))
        .await
        .unwrap()
        .0
        .id;

    let ids = |rows: Vec<chorely_server::storage::models::ChoreRow>| {
        rows.into_iter().map(|r| r.0.id).collect::<Vec<_>>()
    };

    let all = store
        .list_chores(&family_id, ChoreFilter::default())
        .await
        .unwrap();
    assert_eq!(ids(all), vec![early.clone(), late.clone(), undated.clone()]);

    let mine = store
        .list_chores(
            &family_id,
            ChoreFilter {
                assigned_to_id: Some(child_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(mine), vec![early.clone(), undated.clone()]);

    let window = store
        .list_chores(
            &family_id,
            ChoreFilter {
                due_from: Some(parse_due_date("2031-01-01").unwrap()),
                due_to: Some(parse_due_date("2031-02-01").unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(window), vec![early.clone()]);

    store.complete_chore(&early, &child_id).await.unwrap();
    let completed = store
        .list_chores(
            &family_id,
            ChoreFilter {
                statuses: vec![ChoreStatus::Completed],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(completed), vec![early.clone()]);

    let counts = store.count_chores_by_status(&family_id).await.unwrap();
    assert_eq!((counts.pending, counts.completed, counts.approved), (2, 1, 0));
}

#[tokio::test]
async fn chore_update_and_delete() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;
    let id = store
        .create_chore(chore(&family_id, &child_id, 5, Some("2031-05-05")))
        .await
        .unwrap()
        .0
        .id;

    let (assignment, template, assignee) = store
        .update_chore(
            &id,
            ChoreUpdate {
                title: Some("Dishes".into()),
                base_points: Some(9),
                frequency: Some(Frequency::Daily),
                assigned_to_id: Some(parent_id.clone()),
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(template.title, "Dishes");
    assert_eq!(template.base_points, 9);
    assert_eq!(template.frequency, "daily");
    assert_eq!(assignee.id, parent_id);
    assert!(assignment.due_date.is_none());

    let other = store
        .register_user(account(
            "dad@example.org",
            Role::Parent,
            FamilyMembership::Create {
                name: "Joneses".into(),
            },
        ))
        .await
        .unwrap();
    let outsider = store
        .update_chore(
            &id,
            ChoreUpdate {
                assigned_to_id: Some(other.id.clone()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(outsider, Err(StorageError::InvalidInput(_))));
    let foreign = store.create_chore(chore(&family_id, &other.id, 1, None)).await;
    assert!(matches!(foreign, Err(StorageError::InvalidInput(_))));

    assert!(store.delete_chore(&id).await.unwrap());
    assert!(store.get_chore(&id).await.unwrap().is_none());
    assert!(!store.delete_chore(&id).await.unwrap());
}

#[tokio::test]
async fn redemption_never_overdraws() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;
    let reward = store.create_reward(&family_id, "Movie", 10).await.unwrap();
    assert!(reward.is_active);

    let broke = store.redeem_reward(&family_id, &reward.id, &child_id).await;
    assert!(matches!(broke, Err(StorageError::InsufficientPoints)));

    store
        .adjust_points(&child_id, 15, Some("allowance"), &parent_id)
        .await
        .unwrap();
    let outcome = store
        .redeem_reward(&family_id, &reward.id, &child_id)
        .await
        .unwrap();
    assert_eq!(outcome.balance, 5);
    assert_eq!(outcome.points_spent, 10);
    assert_eq!(outcome.reward.redeemed_count, 1);

    let again = store.redeem_reward(&family_id, &reward.id, &child_id).await;
    assert!(matches!(again, Err(StorageError::InsufficientPoints)));
    assert_eq!(store.get_user(&child_id).await.unwrap().unwrap().points, 5);

    let wrong_family = store.redeem_reward("elsewhere", &reward.id, &child_id).await;
    assert!(matches!(wrong_family, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn rewards_update_and_deactivate() {
    let (store, _dir) = store().await;
    let (family_id, _parent_id, child_id) = family(&store).await;
    let pricey = store.create_reward(&family_id, "Bike", 500).await.unwrap();
    let cheap = store.create_reward(&family_id, "Candy", 3).await.unwrap();

    let listed = store.list_active_rewards(&family_id).await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Candy", "Bike"]);

    let updated = store
        .update_reward(
            &pricey.id,
            RewardUpdate {
                title: None,
                points_required: Some(400),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.points_required, 400);
    assert_eq!(updated.title, "Bike");

    assert!(store.deactivate_reward(&cheap.id).await.unwrap());
    let listed = store.list_active_rewards(&family_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    let stored = store.get_reward(&cheap.id).await.unwrap().unwrap();
    assert!(!stored.is_active);

    let gone = store.redeem_reward(&family_id, &cheap.id, &child_id).await;
    assert!(matches!(gone, Err(StorageError::NotFound(_))));

    let missing = store
        .update_reward(
            "missing",
            RewardUpdate {
                title: Some("x".into()),
                points_required: None,
            },
        )
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn adjustments_keep_balance_non_negative() {
    let (store, _dir) = store().await;
    let (_family_id, parent_id, child_id) = family(&store).await;

    let below = store.adjust_points(&child_id, -1, None, &parent_id).await;
    assert!(matches!(below, Err(StorageError::InvalidInput(_))));
    let ghost = store.adjust_points("ghost", 5, None, &parent_id).await;
    assert!(matches!(ghost, Err(StorageError::NotFound(_))));

    for delta in [4, 6, -3] {
        store
            .adjust_points(&child_id, delta, None, &parent_id)
            .await
            .unwrap();
    }
    assert_eq!(store.get_user(&child_id).await.unwrap().unwrap().points, 7);

    let first = store.list_point_transactions(&child_id, 1, 2).await.unwrap();
    let deltas: Vec<i32> = first.iter().map(|t| t.delta).collect();
    assert_eq!(deltas, vec![-3, 6]);
    assert_eq!(first[0].balance_after, 7);
    let second = store.list_point_transactions(&child_id, 2, 2).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].delta, 4);
    assert!(
        store
            .list_point_transactions(&child_id, 3, 2)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        store.list_point_transactions(&child_id, 0, 2).await,
        Err(StorageError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn balance_is_capped_at_max() {
    let (store, _dir) = store().await;
    let (family_id, parent_id, child_id) = family(&store).await;

    let near = store
        .adjust_points(&child_id, MAX_BALANCE - 10, None, &parent_id)
        .await
        .unwrap();
    assert_eq!(near, MAX_BALANCE - 10);
    let over = store.adjust_points(&child_id, 11, None, &parent_id).await;
    assert!(matches!(over, Err(StorageError::InvalidInput(_))));
    let full = store.adjust_points(&child_id, 10, None, &parent_id).await.unwrap();
    assert_eq!(full, MAX_BALANCE);
    assert_eq!(
        store.get_user(&child_id).await.unwrap().unwrap().points,
        MAX_BALANCE
    );

    let (assignment, _, _) = store
        .create_chore(chore(&family_id, &child_id, 5, None))
        .await
        .unwrap();
    store.complete_chore(&assignment.id, &child_id).await.unwrap();
    let approve = store.approve_chore(&assignment.id, &parent_id).await;
    assert!(matches!(approve, Err(StorageError::InvalidInput(_))));

    // The failed approval leaves the chore and the balance untouched.
    let (still, _, _) = store.get_chore(&assignment.id).await.unwrap().unwrap();
    assert_eq!(still.status, ChoreStatus::Completed.as_str());
    assert_eq!(
        store.get_user(&child_id).await.unwrap().unwrap().points,
        MAX_BALANCE
    );
    let ledger = store.list_point_transactions(&child_id, 1, 10).await.unwrap();
    assert_eq!(ledger.len(), 2);

    let spent = store.adjust_points(&child_id, -1, None, &parent_id).await.unwrap();
    assert_eq!(spent, MAX_BALANCE - 1);
}

#[tokio::test]
async fn sessions_expire_when_idle() {
    let (store, _dir) = store().await;
    let (_family_id, parent_id, _child_id) = family(&store).await;
    store.create_session("jti-1", &parent_id).await.unwrap();

    let recent = Utc::now().naive_utc() - Duration::days(14);
    assert!(store.touch_session_with_cutoff("jti-1", recent).await.unwrap());

    let future = Utc::now().naive_utc() + Duration::days(1);
    assert!(!store.touch_session_with_cutoff("jti-1", future).await.unwrap());

    assert!(store.delete_session("jti-1").await.unwrap());
    assert!(!store.touch_session_with_cutoff("jti-1", recent).await.unwrap());
    assert!(!store.delete_session("jti-1").await.unwrap());
}
