//! Tests for the registry engine
//!
//! Covers authorization, append-only history, status sync and the bookkeeping
//! tables, plus the serialized service wrapper.

#[cfg(test)]
mod tests {
    use crate::{
        chain::BlockClock,
        registry::{RegistryEngine, RegistryService},
        state::RegistryStore,
        types::*,
    };
    use ethers::types::{Address, H256};
    use tokio::sync::mpsc;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const CAROL: Address = Address::repeat_byte(0xc0);
    const DAVE: Address = Address::repeat_byte(0xd0);

    fn h(byte: u8) -> H256 {
        H256::repeat_byte(byte)
    }

    fn ctx(sender: Address, block_height: u64) -> TxContext {
        TxContext::new(sender, block_height)
    }

    fn engine() -> RegistryEngine {
        RegistryEngine::new(RegistryStore::new())
    }

    /// Helper to register a standard e-waste batch owned by `owner`
    fn register(engine: &mut RegistryEngine, owner: Address, hash: H256) {
        engine
            .register(
                &ctx(owner, 1),
                hash,
                "e-waste".to_string(),
                "Accra".to_string(),
                "Discarded handsets".to_string(),
                100,
            )
            .unwrap();
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_register_creates_owned_record() {
        let mut engine = engine();
        engine
            .register(
                &ctx(ALICE, 7),
                h(1),
                "e-waste".to_string(),
                "Accra".to_string(),
                "Discarded handsets".to_string(),
                100,
            )
            .unwrap();

        let batch = engine.get_batch(&h(1)).unwrap();
        assert_eq!(batch.owner, ALICE);
        assert_eq!(batch.timestamp, 7);
        assert_eq!(batch.waste_type, "e-waste");
        assert_eq!(batch.quantity, 100);
        assert_eq!(batch.status, STATUS_REGISTERED);
        assert!(engine.latest_status_entry(&h(1)).is_none());
    }

    #[test]
    fn test_duplicate_register_leaves_record_unchanged() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        let before = engine.get_batch(&h(1)).cloned();
        engine.drain_events();

        let result = engine.register(
            &ctx(BOB, 9),
            h(1),
            "plastic".to_string(),
            "Elsewhere".to_string(),
            String::new(),
            5,
        );

        assert_eq!(result, Err(RegistryError::AlreadyRegistered));
        assert_eq!(engine.get_batch(&h(1)).cloned(), before);
        assert!(engine.drain_events().is_empty());
        assert_eq!(engine.store().batch_count(), 1);
    }

    #[test]
    fn test_duplicate_wins_over_bad_input() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        let result = engine.register(
            &ctx(ALICE, 2),
            h(1),
            "x".repeat(500),
            String::new(),
            String::new(),
            0,
        );
        assert_eq!(result, Err(RegistryError::AlreadyRegistered));
    }

    #[test]
    fn test_register_rejects_oversized_fields() {
        let mut engine = engine();
        let result = engine.register(
            &ctx(ALICE, 1),
            h(1),
            "x".repeat(51),
            "Accra".to_string(),
            String::new(),
            1,
        );

        assert!(matches!(result, Err(RegistryError::InvalidParam(_))));
        assert!(engine.get_batch(&h(1)).is_none());
    }

    #[test]
    fn test_non_owner_mutations_fail_without_state_change() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine.drain_events();
        let c = ctx(CAROL, 5);

        assert_eq!(engine.transfer_ownership(&c, h(1), CAROL), Err(RegistryError::NotOwner));
        assert_eq!(
            engine.record_version(&c, h(1), h(2), "forged".to_string()),
            Err(RegistryError::NotOwner)
        );
        assert_eq!(engine.set_tags(&c, h(1), strings(&["x"])), Err(RegistryError::NotOwner));
        assert_eq!(
            engine.add_collaborator(&c, h(1), CAROL, "self".to_string(), strings(&["update-status"])),
            Err(RegistryError::NotOwner)
        );
        assert_eq!(
            engine.grant_license(&c, h(1), CAROL, 10, "none".to_string()),
            Err(RegistryError::NotOwner)
        );
        assert_eq!(engine.set_revenue_share(&c, h(1), CAROL, 50), Err(RegistryError::NotOwner));

        assert_eq!(engine.get_batch(&h(1)).unwrap().owner, ALICE);
        assert_eq!(engine.last_version_id(), 0);
        assert!(engine.get_tags(&h(1)).is_none());
        assert!(engine.get_collaborator(&h(1), &CAROL).is_none());
        assert!(engine.get_license(&h(1), &CAROL).is_none());
        assert!(engine.get_revenue_share(&h(1), &CAROL).is_none());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_hash_errors() {
        let mut engine = engine();
        let c = ctx(ALICE, 1);

        assert_eq!(engine.transfer_ownership(&c, h(9), BOB), Err(RegistryError::NotFound));
        assert_eq!(
            engine.record_version(&c, h(9), h(2), String::new()),
            Err(RegistryError::NotFound)
        );
        assert_eq!(
            engine.update_status(&c, h(9), "collected".to_string()),
            Err(RegistryError::NotFound)
        );
        // Owner-only bookkeeping reports an unknown hash as a failed owner check
        assert_eq!(engine.set_tags(&c, h(9), Vec::new()), Err(RegistryError::NotOwner));
        assert_eq!(
            engine.add_collaborator(&c, h(9), BOB, "hauler".to_string(), strings(&["update-status"])),
            Err(RegistryError::NotOwner)
        );
        assert_eq!(
            engine.grant_license(&c, h(9), BOB, 10, "transport".to_string()),
            Err(RegistryError::NotOwner)
        );
        assert_eq!(engine.set_revenue_share(&c, h(9), BOB, 10), Err(RegistryError::NotOwner));
        assert!(engine.get_collaborator(&h(9), &BOB).is_none());
        assert!(engine.get_license(&h(9), &BOB).is_none());
    }

    #[test]
    fn test_status_update_authorization() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine
            .add_collaborator(&ctx(ALICE, 2), h(1), BOB, "hauler".to_string(), strings(&["update-status"]))
            .unwrap();
        engine
            .add_collaborator(&ctx(ALICE, 2), h(1), CAROL, "auditor".to_string(), strings(&["read", "Update-Status"]))
            .unwrap();

        assert!(engine.update_status(&ctx(ALICE, 3), h(1), "collected".to_string()).is_ok());
        assert!(engine.update_status(&ctx(BOB, 4), h(1), "processing".to_string()).is_ok());
        assert_eq!(
            engine.update_status(&ctx(CAROL, 5), h(1), "disposed".to_string()),
            Err(RegistryError::PermissionDenied)
        );
        assert_eq!(
            engine.update_status(&ctx(DAVE, 5), h(1), "disposed".to_string()),
            Err(RegistryError::PermissionDenied)
        );
        assert_eq!(engine.get_batch(&h(1)).unwrap().status, "processing");
    }

    #[test]
    fn test_status_history_is_append_only_and_synced() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        engine.update_status(&ctx(ALICE, 10), h(1), "collected".to_string()).unwrap();
        let first = engine.get_status_history_entry(&h(1), 1).cloned().unwrap();
        assert_eq!(engine.store().status_history_count(), 1);

        engine.update_status(&ctx(ALICE, 11), h(1), "recycled".to_string()).unwrap();
        assert_eq!(engine.store().status_history_count(), 2);
        assert_eq!(engine.get_status_history_entry(&h(1), 1), Some(&first));

        let (update_id, latest) = engine.latest_status_entry(&h(1)).unwrap();
        assert_eq!(update_id, 2);
        assert_eq!(latest.status, "recycled");
        assert_eq!(latest.timestamp, 11);
        assert_eq!(latest.updater, ALICE);
        assert_eq!(engine.get_batch(&h(1)).unwrap().status, latest.status);
    }

    #[test]
    fn test_rejected_status_update_leaves_history_alone() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine.update_status(&ctx(ALICE, 2), h(1), "collected".to_string()).unwrap();

        let result = engine.update_status(&ctx(ALICE, 3), h(1), "s".repeat(33));
        assert!(matches!(result, Err(RegistryError::InvalidParam(_))));
        assert_eq!(engine.last_status_update_id(), 1);
        assert_eq!(engine.get_batch(&h(1)).unwrap().status, "collected");
    }

    #[test]
    fn test_counters_are_global_across_batches() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        register(&mut engine, BOB, h(2));

        let v1 = engine.record_version(&ctx(ALICE, 2), h(1), h(11), "first".to_string()).unwrap();
        let v2 = engine.record_version(&ctx(BOB, 2), h(2), h(12), "other batch".to_string()).unwrap();
        let v3 = engine.record_version(&ctx(ALICE, 3), h(1), h(13), "second".to_string()).unwrap();
        assert_eq!((v1, v2, v3), (1, 2, 3));
        assert!(engine.get_version(&h(1), 2).is_none());
        assert_eq!(engine.get_version(&h(2), 2).unwrap().updated_hash, h(12));

        engine.update_status(&ctx(BOB, 4), h(2), "collected".to_string()).unwrap();
        engine.update_status(&ctx(ALICE, 4), h(1), "collected".to_string()).unwrap();
        assert_eq!(engine.latest_status_entry(&h(1)).unwrap().0, 2);
        assert_eq!(engine.last_status_update_id(), 2);
    }

    #[test]
    fn test_record_version_keeps_primary_record() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        let before = engine.get_batch(&h(1)).cloned();

        let version = engine.record_version(&ctx(ALICE, 8), h(1), h(2), "re-weighed".to_string()).unwrap();

        assert_eq!(engine.get_batch(&h(1)).cloned(), before);
        assert!(engine.get_batch(&h(2)).is_none());
        let record = engine.get_version(&h(1), version).unwrap();
        assert_eq!(record.updater, ALICE);
        assert_eq!(record.timestamp, 8);
        assert_eq!(record.notes, "re-weighed");
    }

    #[test]
    fn test_transfer_keeps_delegations_attached() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine
            .add_collaborator(&ctx(ALICE, 2), h(1), BOB, "hauler".to_string(), strings(&["update-status"]))
            .unwrap();
        engine.grant_license(&ctx(ALICE, 2), h(1), BOB, 100, "haul".to_string()).unwrap();
        engine.set_revenue_share(&ctx(ALICE, 2), h(1), BOB, 30).unwrap();

        engine.transfer_ownership(&ctx(ALICE, 3), h(1), DAVE).unwrap();

        assert_eq!(engine.get_batch(&h(1)).unwrap().owner, DAVE);
        assert!(engine.has_permission(&h(1), &BOB, PERMISSION_UPDATE_STATUS));
        assert!(engine.is_license_valid(&h(1), &BOB, 50));
        assert_eq!(engine.get_revenue_share(&h(1), &BOB).unwrap().percentage, 30);
        // The inherited collaborator can still move the batch
        assert!(engine.update_status(&ctx(BOB, 4), h(1), "collected".to_string()).is_ok());
    }

    #[test]
    fn test_tags_replace_whole_set() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        engine.set_tags(&ctx(ALICE, 2), h(1), strings(&["metal", "hazardous"])).unwrap();
        engine.set_tags(&ctx(ALICE, 3), h(1), strings(&["sorted"])).unwrap();
        assert_eq!(engine.get_tags(&h(1)), Some(&strings(&["sorted"])));

        let eleven: Vec<String> = (0..11).map(|i| format!("t{}", i)).collect();
        assert!(matches!(
            engine.set_tags(&ctx(ALICE, 4), h(1), eleven),
            Err(RegistryError::InvalidParam(_))
        ));
        assert_eq!(engine.get_tags(&h(1)), Some(&strings(&["sorted"])));
    }

    #[test]
    fn test_collaborator_upsert_overwrites() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        engine
            .add_collaborator(&ctx(ALICE, 2), h(1), BOB, "hauler".to_string(), strings(&["update-status"]))
            .unwrap();
        engine
            .add_collaborator(&ctx(ALICE, 6), h(1), BOB, "observer".to_string(), strings(&["read"]))
            .unwrap();

        let entry = engine.get_collaborator(&h(1), &BOB).unwrap();
        assert_eq!(entry.role, "observer");
        assert_eq!(entry.permissions, strings(&["read"]));
        assert_eq!(entry.added_at, 6);
        assert!(!engine.has_permission(&h(1), &BOB, PERMISSION_UPDATE_STATUS));
        assert!(!engine.has_permission(&h(1), &CAROL, "read"));

        let six = strings(&["a", "b", "c", "d", "e", "f"]);
        assert!(matches!(
            engine.add_collaborator(&ctx(ALICE, 7), h(1), BOB, "x".to_string(), six),
            Err(RegistryError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_license_expiry_is_checked_against_clock() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine.grant_license(&ctx(ALICE, 20), h(1), BOB, 30, "transport".to_string()).unwrap();

        let license = engine.get_license(&h(1), &BOB).unwrap();
        assert_eq!(license.expiry, 50);
        assert!(license.active);

        assert!(engine.is_license_valid(&h(1), &BOB, 50));
        // The stored flag stays set after expiry
        assert!(!engine.is_license_valid(&h(1), &BOB, 51));
        assert!(engine.get_license(&h(1), &BOB).unwrap().active);
        assert!(!engine.is_license_valid(&h(1), &CAROL, 20));
    }

    #[test]
    fn test_license_expiry_overflow_is_rejected() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        let result = engine.grant_license(&ctx(ALICE, 2), h(1), BOB, u64::MAX, String::new());
        assert!(matches!(result, Err(RegistryError::InvalidParam(_))));
        assert!(engine.get_license(&h(1), &BOB).is_none());
    }

    #[test]
    fn test_revenue_share_bounds_and_reset() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        engine.set_revenue_share(&ctx(ALICE, 2), h(1), BOB, 60).unwrap();
        assert_eq!(
            engine.set_revenue_share(&ctx(ALICE, 3), h(1), BOB, 101),
            Err(RegistryError::InvalidParam("percentage 101 exceeds 100".to_string()))
        );
        assert_eq!(
            engine.get_revenue_share(&h(1), &BOB),
            Some(&RevenueShare { percentage: 60, total_received: 0 })
        );

        engine.set_revenue_share(&ctx(ALICE, 4), h(1), BOB, 100).unwrap();
        assert_eq!(engine.get_revenue_share(&h(1), &BOB).unwrap().percentage, 100);
    }

    #[test]
    fn test_revenue_share_reset_wipes_accrual() {
        let mut store = RegistryStore::new();
        store.insert_batch(
            h(1),
            BatchRecord {
                owner: ALICE,
                timestamp: 1,
                waste_type: "e-waste".to_string(),
                origin: "Accra".to_string(),
                description: String::new(),
                quantity: 100,
                status: STATUS_REGISTERED.to_string(),
            },
        );
        store.replace_revenue_share(h(1), BOB, RevenueShare { percentage: 40, total_received: 500 });
        let mut engine = RegistryEngine::new(store);

        // A rejected update keeps the accrued amount
        assert!(engine.set_revenue_share(&ctx(ALICE, 2), h(1), BOB, 150).is_err());
        assert_eq!(engine.get_revenue_share(&h(1), &BOB).unwrap().total_received, 500);

        engine.set_revenue_share(&ctx(ALICE, 3), h(1), BOB, 40).unwrap();
        assert_eq!(
            engine.get_revenue_share(&h(1), &BOB),
            Some(&RevenueShare { percentage: 40, total_received: 0 })
        );
    }

    #[test]
    fn test_revenue_share_sum_is_not_capped() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));

        engine.set_revenue_share(&ctx(ALICE, 2), h(1), BOB, 80).unwrap();
        engine.set_revenue_share(&ctx(ALICE, 2), h(1), CAROL, 80).unwrap();

        let total: u32 = [BOB, CAROL]
            .iter()
            .filter_map(|p| engine.get_revenue_share(&h(1), p))
            .map(|s| s.percentage)
            .sum();
        assert_eq!(total, 160);
    }

    #[test]
    fn test_events_follow_successful_mutations() {
        let mut engine = engine();
        register(&mut engine, ALICE, h(1));
        engine.update_status(&ctx(ALICE, 2), h(1), "collected".to_string()).unwrap();
        let _ = engine.update_status(&ctx(CAROL, 3), h(1), "disposed".to_string());

        let events = engine.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "batch_registered");
        assert_eq!(
            events[1],
            RegistryEvent::StatusUpdated {
                hash: h(1),
                update_id: 1,
                status: "collected".to_string(),
                updater: ALICE,
                block_height: 2,
            }
        );
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut engine = engine();
        let h1 = h(0x01);

        engine
            .register(
                &ctx(ALICE, 1),
                h1,
                "e-waste".to_string(),
                "Accra".to_string(),
                "Discarded handsets".to_string(),
                100,
            )
            .unwrap();
        assert_eq!(engine.get_batch(&h1).unwrap().status, "registered");

        engine
            .add_collaborator(&ctx(ALICE, 2), h1, BOB, "collector".to_string(), strings(&["update-status"]))
            .unwrap();

        engine.update_status(&ctx(BOB, 3), h1, "collected".to_string()).unwrap();
        assert_eq!(engine.get_batch(&h1).unwrap().status, "collected");

        assert_eq!(
            engine.update_status(&ctx(CAROL, 4), h1, "disposed".to_string()),
            Err(RegistryError::PermissionDenied)
        );

        engine.transfer_ownership(&ctx(ALICE, 5), h1, DAVE).unwrap();
        assert_eq!(
            engine.set_tags(&ctx(ALICE, 6), h1, strings(&["metal"])),
            Err(RegistryError::NotOwner)
        );
        assert!(engine.set_tags(&ctx(DAVE, 6), h1, strings(&["metal"])).is_ok());
    }

    #[tokio::test]
    async fn test_service_stamps_clock_and_forwards_events() {
        let clock = BlockClock::new(40);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = RegistryService::new(engine(), clock.clone()).with_journal(tx);

        service
            .execute(ALICE, |engine, ctx| {
                engine.register(ctx, h(1), "e-waste".to_string(), String::new(), String::new(), 3)
            })
            .await
            .unwrap();
        clock.advance_by(2);
        let denied = service
            .execute(CAROL, |engine, ctx| engine.update_status(ctx, h(1), "disposed".to_string()))
            .await;
        assert_eq!(denied, Err(RegistryError::PermissionDenied));

        let timestamp = service
            .read(|engine, _| engine.get_batch(&h(1)).map(|b| b.timestamp))
            .await;
        assert_eq!(timestamp, Some(40));
        assert_eq!(service.read(|_, height| height).await, 42);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), "batch_registered");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_status_updates_are_serialized() {
        let service = RegistryService::new(engine(), BlockClock::new(1));
        service
            .execute(ALICE, |engine, ctx| {
                engine.register(ctx, h(1), "e-waste".to_string(), String::new(), String::new(), 1)
            })
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .execute(ALICE, move |engine, ctx| {
                        engine.update_status(ctx, h(1), format!("step-{}", i))
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        service
            .read(|engine, _| {
                assert_eq!(engine.last_status_update_id(), 16);
                assert_eq!(engine.store().status_history_count(), 16);
                let (_, latest) = engine.latest_status_entry(&h(1)).unwrap();
                assert_eq!(engine.get_batch(&h(1)).unwrap().status, latest.status);
            })
            .await;
    }
}
