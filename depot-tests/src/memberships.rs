use crate::{MEMBERSHIP, Membership, Role};
use depot_core::{Clause, ConnectionProvider, DepotRepository, Key, MultiKey, TraverseWithFilter};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn memberships<P: ConnectionProvider>(repository: &DepotRepository<P>) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    let result = repository
        .delete_all(
            &MEMBERSHIP,
            MEMBERSHIP.col("account_id").gt(0),
            Some(Box::new(TraverseWithFilter::new("Membership", |_, _| true))),
        )
        .await;
    assert!(
        result.is_ok(),
        "Failed to delete the memberships: {:?}",
        result.unwrap_err()
    );

    let memberships = [
        (1, "chess", Role::Owner),
        (1, "go", Role::Member),
        (2, "chess", Role::Moderator),
    ];
    for (account_id, group, role) in memberships {
        let mut membership = Membership {
            account_id,
            group_name: group.into(),
            role,
            active: true,
        };
        repository
            .insert(&mut membership)
            .await
            .expect("Failed to insert the membership");
    }

    // Composite keys need every field
    assert!(Key::new(&MEMBERSHIP, [("account_id", 1)]).is_err());
    let key = Key::new(
        &MEMBERSHIP,
        [
            ("account_id", depot_core::Value::from(1)),
            ("group_name", "chess".into()),
        ],
    )
    .expect("Failed to build the membership key");
    let owner = repository
        .load::<Membership>(key.clone())
        .await
        .expect("Failed to load the membership")
        .expect("The membership was not found");
    assert_eq!(owner.role, Role::Owner);

    // Both groups of the first account
    let multi = MultiKey::new(&MEMBERSHIP, [("account_id", 1)], "group_name", ["chess", "go"])
        .expect("Failed to build the multi key");
    let mut found = repository
        .find_all::<Membership>([Clause::where_(multi)])
        .await
        .expect("Failed to find the memberships");
    found.sort_by(|a, b| a.group_name.cmp(&b.group_name));
    assert_eq!(
        found.iter().map(|m| m.role).collect::<Vec<_>>(),
        [Role::Owner, Role::Member]
    );

    let mut demoted = owner.clone();
    demoted.role = Role::Member;
    demoted.active = false;
    let updated = repository
        .update_fields(&demoted, ["role", "active"])
        .await
        .expect("Failed to demote the owner");
    assert_eq!(updated, 1);
    let loaded = repository
        .load::<Membership>(key)
        .await
        .expect("Failed to load the membership");
    assert_eq!(loaded, Some(demoted));
}
