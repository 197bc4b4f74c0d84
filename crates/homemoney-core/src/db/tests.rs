//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lifecycle::{RenewPolicy, MAX_DAYS};
    use crate::operation_log::{LogEntry, LogQuery};
    use crate::query::{ExpenseQuery, ExpenseQueryParams};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn new_expense(expense_type: &str, amount: f64, time: DateTime<Utc>) -> NewExpense {
        NewExpense {
            expense_type: expense_type.to_string(),
            remark: None,
            amount,
            time: Some(time),
        }
    }

    fn query(params: ExpenseQueryParams) -> ExpenseQuery {
        ExpenseQuery::from_params(&params).unwrap()
    }

    fn plan(db: &Database, name: &str, duration: i64, price: f64) -> SubscriptionPlan {
        db.create_plan(&NewPlan {
            name: name.to_string(),
            description: Some(format!("{} plan", name)),
            duration,
            price,
            period: Some("monthly".into()),
            is_active: None,
        })
        .unwrap()
    }

    fn subscribe(
        db: &Database,
        username: &str,
        plan_id: &str,
        auto_renew: bool,
        now: DateTime<Utc>,
    ) -> crate::error::Result<UserSubscription> {
        db.create_subscription(
            &NewSubscription {
                username: username.to_string(),
                plan_id: plan_id.to_string(),
                auto_renew,
                payment_id: None,
            },
            now,
        )
    }

    fn status_of(db: &Database, id: &str) -> SubscriptionStatus {
        db.get_subscription(id).unwrap().unwrap().status
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        db.ping().unwrap();
        let (expenses, total) = db.list_expenses(&ExpenseQuery::default()).unwrap();
        assert!(expenses.is_empty());
        assert_eq!(total, 0);
        assert!(db.list_members().unwrap().is_empty());
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('expenses', 'members', 'subscription_plans', 'user_subscriptions', 'operation_logs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_expense_crud() {
        let db = Database::in_memory().unwrap();

        let created = db
            .create_expense(&NewExpense {
                remark: Some("  weekly shop ".into()),
                ..new_expense("groceries", 42.456, t0())
            })
            .unwrap();
        assert_eq!(created.amount, 42.46);
        assert_eq!(created.remark.as_deref(), Some("weekly shop"));
        assert_eq!(created.time, t0());

        let fetched = db.get_expense(&created.id).unwrap().unwrap();
        assert_eq!(fetched.expense_type, "groceries");

        let updated = db
            .update_expense(&created.id, &new_expense("dining", 10.0, t0()))
            .unwrap();
        assert_eq!(updated.expense_type, "dining");
        assert_eq!(updated.amount, 10.0);
        assert!(updated.remark.is_none());

        db.delete_expense(&created.id).unwrap();
        assert!(db.get_expense(&created.id).unwrap().is_none());
        assert!(matches!(
            db.delete_expense(&created.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.update_expense("missing", &new_expense("x", 1.0, t0())),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_expense_validation_before_write() {
        let db = Database::in_memory().unwrap();
        assert!(db.create_expense(&new_expense("", 5.0, t0())).is_err());
        assert!(db.create_expense(&new_expense("food", 0.0, t0())).is_err());
        assert!(db
            .create_expense(&NewExpense {
                time: None,
                ..new_expense("food", 5.0, t0())
            })
            .is_err());
        assert_eq!(db.list_expenses(&ExpenseQuery::default()).unwrap().1, 0);
    }

    #[test]
    fn test_expense_amount_rounding_to_zero_is_a_validation_error() {
        let db = Database::in_memory().unwrap();

        let err = db.create_expense(&new_expense("food", 0.004, t0())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let batch = vec![new_expense("food", 5.0, t0()), new_expense("food", 0.004, t0())];
        let err = db.create_expenses_batch(&batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("record 1"));
        assert_eq!(db.list_expenses(&ExpenseQuery::default()).unwrap().1, 0);

        let kept = db.create_expense(&new_expense("food", 0.006, t0())).unwrap();
        assert_eq!(kept.amount, 0.01);
    }

    #[test]
    fn test_expense_batch_is_all_or_nothing() {
        let db = Database::in_memory().unwrap();

        let bad = vec![new_expense("food", 5.0, t0()), new_expense("food", -1.0, t0())];
        let err = db.create_expenses_batch(&bad).unwrap_err();
        assert!(err.to_string().contains("record 1"));
        assert_eq!(db.list_expenses(&ExpenseQuery::default()).unwrap().1, 0);

        let good = vec![new_expense("food", 5.0, t0()), new_expense("rent", 900.0, t0())];
        let created = db.create_expenses_batch(&good).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(db.list_expenses(&ExpenseQuery::default()).unwrap().1, 2);
    }

    fn seed_expenses(db: &Database) {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let records = vec![
            NewExpense {
                remark: Some("milk and bread".into()),
                ..new_expense("groceries", 12.0, base)
            },
            new_expense("groceries", 30.0, base + Duration::days(1)),
            new_expense("rent", 1000.0, base + Duration::days(2)),
            new_expense("transport", 3.5, base + Duration::days(20)),
            new_expense("dining", 45.0, base - Duration::days(30)),
        ];
        db.create_expenses_batch(&records).unwrap();
    }

    #[test]
    fn test_list_expenses_pagination_and_sort() {
        let db = Database::in_memory().unwrap();
        seed_expenses(&db);

        let (page1, total) = db
            .list_expenses(&query(ExpenseQueryParams {
                limit: Some(2),
                page: Some(1),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].expense_type, "transport");

        let (page3, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                limit: Some(2),
                page: Some(3),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].expense_type, "dining");

        let (by_amount, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                sort: Some("amountAsc".into()),
                ..Default::default()
            }))
            .unwrap();
        let amounts: Vec<f64> = by_amount.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![3.5, 12.0, 30.0, 45.0, 1000.0]);
    }

    #[test]
    fn test_list_expenses_filters() {
        let db = Database::in_memory().unwrap();
        seed_expenses(&db);

        let (january, total) = db
            .list_expenses(&query(ExpenseQueryParams {
                month: Some("2024-01".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(total, 3);
        assert!(january.iter().all(|e| e.time.format("%Y-%m").to_string() == "2024-01"));

        let (keyword, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                keyword: Some("BREAD".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(keyword.len(), 1);
        assert_eq!(keyword[0].amount, 12.0);

        let (by_type, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                expense_type: Some("groceries".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(by_type.len(), 2);

        let (ranged, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                min_amount: Some(12.0),
                max_amount: Some(45.0),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(ranged.len(), 3);

        let (since, _) = db
            .list_expenses(&query(ExpenseQueryParams {
                start_date: Some("2024-01-17".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(since.len(), 2);
    }

    #[test]
    fn test_keyword_wildcards_match_literally() {
        let db = Database::in_memory().unwrap();
        db.create_expenses_batch(&[
            NewExpense {
                remark: Some("50% off".into()),
                ..new_expense("clothes", 20.0, t0())
            },
            NewExpense {
                remark: Some("500 grams".into()),
                ..new_expense("food", 4.0, t0())
            },
            new_expense("rent", 900.0, t0()),
        ])
        .unwrap();

        let count = |keyword: &str| {
            db.list_expenses(&query(ExpenseQueryParams {
                keyword: Some(keyword.into()),
                ..Default::default()
            }))
            .unwrap()
            .1
        };
        assert_eq!(count("50%"), 1);
        assert_eq!(count("%"), 1);
        assert_eq!(count("_"), 0);
        assert_eq!(count("50"), 2);
    }

    #[test]
    fn test_huge_page_is_rejected() {
        let result = ExpenseQuery::from_params(&ExpenseQueryParams {
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidPagination(_))));
    }

    #[test]
    fn test_expense_statistics_follow_filters() {
        let db = Database::in_memory().unwrap();
        seed_expenses(&db);

        let stats = db
            .expense_statistics(&query(ExpenseQueryParams {
                month: Some("2024-01".into()),
                limit: Some(1),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_amount, 1042.0);
        assert_eq!(stats.median_amount, 30.0);
        assert_eq!(stats.type_distribution["groceries"].count, 2);
        assert_eq!(stats.type_distribution["groceries"].percentage, 67);
        assert_eq!(stats.type_distribution["rent"].percentage, 33);

        let empty = db
            .expense_statistics(&query(ExpenseQueryParams {
                month: Some("2030-01".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(empty, ExpenseStatistics::default());
    }

    #[test]
    fn test_expense_meta() {
        let db = Database::in_memory().unwrap();
        seed_expenses(&db);

        let meta = db.expense_meta().unwrap();
        assert_eq!(
            meta.unique_types,
            vec!["dining", "groceries", "rent", "transport"]
        );
        assert_eq!(meta.available_months, vec!["2024-02", "2024-01", "2023-12"]);
    }

    #[test]
    fn test_member_get_or_create() {
        let db = Database::in_memory().unwrap();

        let first = db.get_or_create_member("alice").unwrap();
        assert!(!first.is_active);

        let second = db.get_or_create_member(" alice ").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.list_members().unwrap().len(), 1);

        assert!(matches!(
            db.get_or_create_member("   "),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_member_get_or_create_concurrent() {
        let db = Database::in_memory().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.get_or_create_member("carol").unwrap().id)
            })
            .collect();
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(db.list_members().unwrap().len(), 1);
    }

    #[test]
    fn test_member_status() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("bob").unwrap();

        let member = db.update_member_status("bob", true).unwrap();
        assert!(member.is_active);

        assert!(matches!(
            db.update_member_status("nobody", true),
            Err(Error::MemberNotFound(_))
        ));
    }

    #[test]
    fn test_plan_catalog() {
        let db = Database::in_memory().unwrap();
        let yearly = plan(&db, "Yearly", 365, 99.0);
        let monthly = plan(&db, "Monthly", 30, 9.9);

        let all = db.list_plans(false).unwrap();
        assert_eq!(all[0].id, monthly.id);
        assert_eq!(all[1].id, yearly.id);
        assert!(all.iter().all(|p| p.is_active));

        let dup = db.create_plan(&NewPlan {
            name: "Monthly".into(),
            duration: 30,
            price: 1.0,
            ..Default::default()
        });
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let toggled = db.toggle_plan_status(&monthly.id).unwrap();
        assert!(!toggled.is_active);
        let active = db.list_plans(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, yearly.id);

        let updated = db
            .update_plan(
                &yearly.id,
                &NewPlan {
                    name: "Annual".into(),
                    duration: 366,
                    price: 89.0,
                    period: Some("yearly".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Annual");
        assert_eq!(updated.period, PlanPeriod::Yearly);
        assert!(updated.is_active);

        assert!(matches!(
            db.toggle_plan_status("missing"),
            Err(Error::PlanNotFound(_))
        ));
    }

    #[test]
    fn test_create_subscription_window() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);

        let sub = subscribe(&db, "alice", &p.id, true, t0()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.start_date, t0());
        assert_eq!(sub.end_date, t0() + Duration::days(30));
        assert!(sub.auto_renew);
        assert_eq!(sub.plan.as_ref().unwrap().name, "Monthly");
    }

    #[test]
    fn test_create_subscription_failures() {
        let db = Database::in_memory().unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);

        assert!(matches!(
            subscribe(&db, "ghost", &p.id, false, t0()),
            Err(Error::MemberNotFound(_))
        ));

        db.get_or_create_member("alice").unwrap();
        assert!(matches!(
            subscribe(&db, "alice", "no-such-plan", false, t0()),
            Err(Error::PlanNotFound(_))
        ));

        db.toggle_plan_status(&p.id).unwrap();
        assert!(matches!(
            subscribe(&db, "alice", &p.id, false, t0()),
            Err(Error::PlanInactive(_))
        ));
    }

    #[test]
    fn test_duplicate_active_subscription_rejected() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);

        subscribe(&db, "alice", &p.id, false, t0()).unwrap();
        let err = subscribe(&db, "alice", &p.id, false, t0() + Duration::days(5)).unwrap_err();
        assert!(matches!(err, Error::DuplicateActiveSubscription(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);

        // Once the window has passed a new subscription is allowed
        subscribe(&db, "alice", &p.id, false, t0() + Duration::days(31)).unwrap();
    }

    #[test]
    fn test_concurrent_create_yields_single_active() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("dave").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let db = db.clone();
                let plan_id = p.id.clone();
                std::thread::spawn(move || subscribe(&db, "dave", &plan_id, false, t0()).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        let member = db.get_member_by_username("dave").unwrap().unwrap();
        assert_eq!(db.list_member_subscriptions(&member.id).unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_subscription() {
        let db = Database::in_memory().unwrap();
        let member = db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, false, t0()).unwrap();

        let canceled = db.cancel_subscription(&sub.id).unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);
        assert!(db.get_current_subscription(&member.id, t0()).unwrap().is_none());

        // Canceling again is not guarded
        db.cancel_subscription(&sub.id).unwrap();
        assert!(matches!(
            db.cancel_subscription("missing"),
            Err(Error::SubscriptionNotFound(_))
        ));

        // A canceled subscription no longer blocks a new one
        subscribe(&db, "alice", &p.id, false, t0()).unwrap();
    }

    #[test]
    fn test_renew_extends_from_previous_end() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, false, t0()).unwrap();

        let renewed = db
            .renew_subscription(&sub.id, RenewPolicy::AllowAny, t0() + Duration::days(3))
            .unwrap();
        assert_eq!(renewed.end_date, sub.end_date + Duration::days(30));
        assert_eq!(renewed.start_date, sub.start_date);
        assert_eq!(renewed.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_renew_reactivates_canceled_under_allow_policy() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, false, t0()).unwrap();
        db.cancel_subscription(&sub.id).unwrap();

        let rejected = db.renew_subscription(&sub.id, RenewPolicy::ActiveOnly, t0());
        assert!(matches!(rejected, Err(Error::RenewNotAllowed(_))));
        assert_eq!(status_of(&db, &sub.id), SubscriptionStatus::Canceled);

        let renewed = db
            .renew_subscription(&sub.id, RenewPolicy::AllowAny, t0())
            .unwrap();
        assert_eq!(renewed.status, SubscriptionStatus::Active);
        assert_eq!(renewed.end_date, t0() + Duration::days(60));
    }

    #[test]
    fn test_renew_missing_references() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, false, t0()).unwrap();

        assert!(matches!(
            db.renew_subscription("missing", RenewPolicy::AllowAny, t0()),
            Err(Error::SubscriptionNotFound(_))
        ));

        db.delete_plan(&p.id).unwrap();
        assert!(matches!(
            db.renew_subscription(&sub.id, RenewPolicy::AllowAny, t0()),
            Err(Error::PlanNotFound(_))
        ));
        // The dangling reference still loads, without a plan
        assert!(db.get_subscription(&sub.id).unwrap().unwrap().plan.is_none());
    }

    #[test]
    fn test_plan_duration_is_bounded() {
        let db = Database::in_memory().unwrap();
        let huge = NewPlan {
            name: "Forever".into(),
            duration: 200_000_000,
            price: 1.0,
            ..Default::default()
        };
        assert!(matches!(db.create_plan(&huge), Err(Error::InvalidData(_))));

        let p = plan(&db, "Century", MAX_DAYS, 1.0);
        assert!(matches!(db.update_plan(&p.id, &huge), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_out_of_range_stored_duration_does_not_panic() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, true, t0()).unwrap();

        // A row written before durations were bounded
        db.conn()
            .unwrap()
            .execute(
                "UPDATE subscription_plans SET duration = ? WHERE id = ?",
                rusqlite::params![i64::MAX / 2, p.id],
            )
            .unwrap();

        assert!(matches!(
            db.renew_subscription(&sub.id, RenewPolicy::AllowAny, t0()),
            Err(Error::InvalidData(_))
        ));
        assert_eq!(db.auto_renew_subscriptions(t0() + Duration::days(60)).unwrap(), 0);

        db.get_or_create_member("bob").unwrap();
        assert!(matches!(
            subscribe(&db, "bob", &p.id, false, t0()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_huge_day_windows_are_rejected() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.get_expiring_subscriptions(i64::MAX / 2, t0()),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.clean_operation_logs(i64::MAX, t0()),
            Err(Error::InvalidData(_))
        ));
        assert!(db.get_expiring_subscriptions(MAX_DAYS, t0()).unwrap().is_empty());
    }

    #[test]
    fn test_expire_overdue_is_exact_and_idempotent() {
        let db = Database::in_memory().unwrap();
        for name in ["a", "b", "c"] {
            db.get_or_create_member(name).unwrap();
        }
        let short = plan(&db, "Short", 10, 1.0);
        let long = plan(&db, "Long", 60, 5.0);

        let overdue = subscribe(&db, "a", &short.id, false, t0()).unwrap();
        let still_running = subscribe(&db, "b", &long.id, false, t0()).unwrap();
        let canceled = subscribe(&db, "c", &short.id, false, t0()).unwrap();
        db.cancel_subscription(&canceled.id).unwrap();

        let now = t0() + Duration::days(20);
        assert_eq!(db.expire_overdue_subscriptions(now).unwrap(), 1);
        assert_eq!(status_of(&db, &overdue.id), SubscriptionStatus::Expired);
        assert_eq!(status_of(&db, &still_running.id), SubscriptionStatus::Active);
        assert_eq!(status_of(&db, &canceled.id), SubscriptionStatus::Canceled);

        assert_eq!(db.expire_overdue_subscriptions(now).unwrap(), 0);
    }

    #[test]
    fn test_auto_renew_sweep() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_member("a").unwrap();
        db.get_or_create_member("b").unwrap();
        let p = plan(&db, "Short", 10, 1.0);

        let auto = subscribe(&db, "a", &p.id, true, t0()).unwrap();
        let manual = subscribe(&db, "b", &p.id, false, t0()).unwrap();

        let now = t0() + Duration::days(11);
        assert_eq!(db.auto_renew_subscriptions(now).unwrap(), 1);
        let renewed = db.get_subscription(&auto.id).unwrap().unwrap();
        assert_eq!(renewed.end_date, auto.end_date + Duration::days(10));
        assert_eq!(renewed.start_date, auto.start_date);

        // The expiry sweep then only catches the non-renewing one
        assert_eq!(db.expire_overdue_subscriptions(now).unwrap(), 1);
        assert_eq!(status_of(&db, &manual.id), SubscriptionStatus::Expired);
        assert_eq!(status_of(&db, &auto.id), SubscriptionStatus::Active);
    }

    #[test]
    fn test_current_subscription_window() {
        let db = Database::in_memory().unwrap();
        let member = db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);
        let sub = subscribe(&db, "alice", &p.id, false, t0()).unwrap();

        let current = db.get_current_subscription(&member.id, t0() + Duration::days(1));
        assert_eq!(current.unwrap().unwrap().id, sub.id);
        assert!(db
            .get_current_subscription(&member.id, t0() + Duration::days(31))
            .unwrap()
            .is_none());

        let with = db
            .get_member_with_subscription("alice", t0() + Duration::days(1))
            .unwrap()
            .unwrap();
        assert_eq!(with.current_subscription.unwrap().id, sub.id);
        assert!(db
            .get_member_with_subscription("ghost", t0())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_member_subscription_history() {
        let db = Database::in_memory().unwrap();
        let member = db.get_or_create_member("alice").unwrap();
        let p = plan(&db, "Monthly", 30, 9.9);

        let first = subscribe(&db, "alice", &p.id, false, t0()).unwrap();
        db.cancel_subscription(&first.id).unwrap();
        let second = subscribe(&db, "alice", &p.id, false, t0() + Duration::days(1)).unwrap();

        let history = db.list_member_subscriptions(&member.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn test_expiring_subscriptions() {
        let db = Database::in_memory().unwrap();
        for name in ["a", "b", "c"] {
            db.get_or_create_member(name).unwrap();
        }
        let week = plan(&db, "Week", 7, 1.0);
        let month = plan(&db, "Month", 30, 3.0);
        let soon = subscribe(&db, "a", &week.id, false, t0()).unwrap();
        subscribe(&db, "b", &month.id, false, t0()).unwrap();
        let canceled = subscribe(&db, "c", &week.id, false, t0()).unwrap();
        db.cancel_subscription(&canceled.id).unwrap();

        let expiring = db.get_expiring_subscriptions(7, t0()).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].id, soon.id);

        assert_eq!(db.get_expiring_subscriptions(30, t0()).unwrap().len(), 2);
        assert!(db
            .get_expiring_subscriptions(7, t0() + Duration::days(8))
            .unwrap()
            .is_empty());
        assert!(db.get_expiring_subscriptions(0, t0()).is_err());
    }

    fn log_entry(log_type: &str, timestamp: &str, username: &str) -> LogEntry {
        serde_json::from_value(serde_json::json!({
            "timestamp": timestamp,
            "type": log_type,
            "action": "click",
            "user": {"username": username},
            "details": {"button": "save"}
        }))
        .unwrap()
    }

    #[test]
    fn test_operation_logs_roundtrip() {
        let db = Database::in_memory().unwrap();
        db.save_operation_log(&log_entry("user_action", "2024-03-01T10:00:00.000Z", "alice"))
            .unwrap();
        db.save_operation_log(&log_entry("user_action", "2024-03-02T10:00:00.000Z", "bob"))
            .unwrap();
        db.save_operation_log(&log_entry("page_error", "2024-03-03T10:00:00.000Z", "alice"))
            .unwrap();

        let (logs, total) = db.list_operation_logs(&LogQuery::default()).unwrap();
        assert_eq!(total, 3);
        assert_eq!(logs[0].timestamp, "2024-03-03T10:00:00.000Z");
        assert_eq!(logs[0].user["username"], "alice");
        assert_eq!(logs[2].details["button"], "save");

        let (alice, total) = db
            .list_operation_logs(&LogQuery {
                username: Some("alice".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(alice.len(), 2);

        let stats = db.operation_log_stats(&LogQuery::default()).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.type_stats.len(), 7);
        let user_actions = stats
            .type_stats
            .iter()
            .find(|s| s.log_type == "user_action")
            .unwrap();
        assert_eq!(user_actions.count, 2);
    }

    #[test]
    fn test_operation_log_requires_fields() {
        let db = Database::in_memory().unwrap();
        let result = db.save_operation_log(&LogEntry::default());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_clean_operation_logs() {
        let db = Database::in_memory().unwrap();
        db.save_operation_log(&log_entry("user_action", "2024-01-01T00:00:00.000Z", "a"))
            .unwrap();
        db.save_operation_log(&log_entry("user_action", "2024-02-28T00:00:00.000Z", "a"))
            .unwrap();

        assert!(db.clean_operation_logs(0, t0()).is_err());
        assert_eq!(db.clean_operation_logs(45, t0()).unwrap(), 1);
        assert_eq!(db.list_operation_logs(&LogQuery::default()).unwrap().1, 1);
    }
}
