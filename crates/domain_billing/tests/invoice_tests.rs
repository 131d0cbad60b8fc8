//! Invoice assembly, arrear refresh and seeding against the in-memory port

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillingPhase, CustomerId, PlanId};

use domain_billing::ports::mock::MockBillingPort;
use domain_billing::{
    ArrearRefreshService, BillingConfig, BillingError, BillingPort, CreateInvoiceRequest,
    DueNumberSource, EnrollRequest, Enrollment, InvoiceService, Plan, RefreshState,
};
use test_utils::{
    assert_invoice_chain, assert_invoice_total, assert_money_eq, assert_money_zero, DateFixtures,
    MoneyFixtures, PlanFixtures, TestPlanBuilder,
};

struct Harness {
    port: Arc<MockBillingPort>,
    invoices: InvoiceService,
    refresh: ArrearRefreshService,
}

impl Harness {
    async fn new(plans: Vec<Plan>, config: BillingConfig) -> Self {
        let port = Arc::new(MockBillingPort::with_plans(plans).await);
        let invoices = InvoiceService::new(port.clone(), config);
        let refresh = ArrearRefreshService::new(port.clone(), invoices.locks().clone());
        Self { port, invoices, refresh }
    }

    async fn enroll(&self, plan: &Plan, member_number: &str, start: NaiveDate) -> Enrollment {
        self.invoices
            .enroll(EnrollRequest {
                customer_id: CustomerId::new(),
                plan_id: plan.id,
                member_number: member_number.to_string(),
                start_date: start,
            })
            .await
            .unwrap()
    }
}

fn invoice_request(enrollment: &Enrollment, on: NaiveDate, received: Decimal) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        customer_id: enrollment.customer_id,
        plan_id: enrollment.plan_id,
        invoice_date: Some(on),
        received_amount: Some(received),
        ..Default::default()
    }
}

// ============================================================================
// Invoice Assembly
// ============================================================================

mod assembly_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_carry_then_reset() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-001", DateFixtures::ymd(2024, 2, 10)).await;

        let first = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 15), dec!(0)))
            .await
            .unwrap();
        assert_eq!(first.due_number, 1);
        assert_eq!(first.phase, BillingPhase::Carry);
        assert!(first.arrear_amount.is_zero());
        assert_eq!(first.previous_balance, MoneyFixtures::inr(dec!(1000)));
        assert_eq!(first.balance_amount, MoneyFixtures::inr(dec!(1000)));

        // March 21st is past the cutoff, so it bills April: installment 3
        let second = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 3, 21), dec!(1000)))
            .await
            .unwrap();
        assert_eq!(second.due_number, 3);
        assert_eq!(second.phase, BillingPhase::Reset);
        assert_eq!(second.arrear_amount, first.balance_amount);
        assert_eq!(second.balance_amount, MoneyFixtures::inr(dec!(1000)));
        assert_eq!(second.total_amount, MoneyFixtures::inr(dec!(2000)));
        assert_eq!(second.payment_month, "April 2024");
        assert_eq!(second.previous_invoice_id, Some(first.id));
        assert_eq!(second.invoice_number, "000002");
        assert_invoice_total(&first);
        assert_invoice_total(&second);
        assert_invoice_chain(&[first, second]);

        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert_eq!(stored.total_paid, MoneyFixtures::inr(dec!(1000)));
        assert_eq!(stored.total_due, MoneyFixtures::inr(dec!(2000)));
    }

    #[tokio::test]
    async fn test_carry_chain_keeps_arrear_constant() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-002", DateFixtures::ymd(2024, 2, 1)).await;

        let mut balances = Vec::new();
        let mut chain = Vec::new();
        for (on, received) in [
            (DateFixtures::ymd(2024, 2, 5), dec!(200)),
            (DateFixtures::ymd(2024, 2, 12), dec!(300)),
            (DateFixtures::ymd(2024, 3, 5), dec!(100)),
        ] {
            let invoice = h
                .invoices
                .create_invoice(invoice_request(&enrollment, on, received))
                .await
                .unwrap();
            assert_money_zero(&invoice.arrear_amount);
            balances.push(invoice.balance_amount);
            chain.push(invoice);
        }

        assert_eq!(
            balances,
            vec![MoneyFixtures::inr(dec!(800)), MoneyFixtures::inr(dec!(500)), MoneyFixtures::inr(dec!(400))]
        );
        assert_invoice_chain(&chain);
    }

    #[tokio::test]
    async fn test_reset_day_rolls_prior_balance_into_arrear() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-003", DateFixtures::ymd(2024, 2, 1)).await;

        h.invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 10), dec!(500)))
            .await
            .unwrap();
        let reset = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 21), dec!(300)))
            .await
            .unwrap();

        assert_eq!(reset.arrear_amount, MoneyFixtures::inr(dec!(500)));
        assert_eq!(reset.balance_amount, MoneyFixtures::inr(dec!(1200)));
    }

    #[tokio::test]
    async fn test_exhausted_plan_persists_nothing() {
        let plan = PlanFixtures::flat(6, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-004", DateFixtures::ymd(2024, 1, 1)).await;

        let err = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 9, 1), dec!(0)))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidDueNumber { due_number: 9, duration: 6 }));
        assert!(err.is_validation());
        assert_eq!(h.port.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_manual_due_number_skips_calendar() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-005", DateFixtures::ymd(2024, 2, 10)).await;

        let mut request = invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 15), dec!(0));
        request.manual_due_number = Some(5);
        let invoice = h.invoices.create_invoice(request.clone()).await.unwrap();
        assert_eq!(invoice.due_number, 5);
        assert_eq!(invoice.due_number_source, DueNumberSource::Manual);

        request.manual_due_number = Some(13);
        assert!(matches!(
            h.invoices.create_invoice(request).await,
            Err(BillingError::InvalidDueNumber { due_number: 13, .. })
        ));
    }

    #[tokio::test]
    async fn test_per_installment_schedule() {
        let plan = PlanFixtures::per_installment(&[dec!(1000), dec!(900), dec!(800)]);
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-006", DateFixtures::ymd(2024, 1, 1)).await;

        let invoice = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(0)))
            .await
            .unwrap();
        assert_eq!(invoice.due_number, 2);
        assert_eq!(invoice.due_amount, MoneyFixtures::inr(dec!(900)));
    }

    #[tokio::test]
    async fn test_schedule_gap_bills_flat_amount() {
        let plan = TestPlanBuilder::new()
            .with_installment(dec!(750))
            .with_schedule(vec![Some(dec!(1000)), None, Some(dec!(1200))])
            .build();
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-011", DateFixtures::ymd(2024, 1, 1)).await;

        let invoice = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(0)))
            .await
            .unwrap();
        assert_eq!(invoice.due_number, 2);
        assert_money_eq(&invoice.due_amount, dec!(750));
        assert_invoice_total(&invoice);
    }

    #[tokio::test]
    async fn test_overpayment_follows_balance_policy() {
        let plan = PlanFixtures::flat(12, dec!(1000));

        let floored = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = floored.enroll(&plan, "M-007", DateFixtures::ymd(2024, 2, 1)).await;
        let invoice = floored
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(1500)))
            .await
            .unwrap();
        assert!(invoice.balance_amount.is_zero());

        let config = BillingConfig { allow_negative_balance: true, ..Default::default() };
        let credit = Harness::new(vec![plan.clone()], config).await;
        let enrollment = credit.enroll(&plan, "M-008", DateFixtures::ymd(2024, 2, 1)).await;
        let invoice = credit
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(1500)))
            .await
            .unwrap();
        assert_eq!(invoice.balance_amount, MoneyFixtures::inr(dec!(-500)));
    }

    #[tokio::test]
    async fn test_unknown_plan_in_enrollment() {
        let h = Harness::new(vec![], BillingConfig::default()).await;
        let err = h
            .invoices
            .enroll(EnrollRequest {
                customer_id: CustomerId::new(),
                plan_id: PlanId::new(),
                member_number: "M-009".into(),
                start_date: DateFixtures::ymd(2024, 1, 1),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PlanNotFound(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_member_number() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        h.enroll(&plan, "M-010", DateFixtures::ymd(2024, 1, 1)).await;

        let err = h
            .invoices
            .enroll(EnrollRequest {
                customer_id: CustomerId::new(),
                plan_id: plan.id,
                member_number: "M-010".into(),
                start_date: DateFixtures::ymd(2024, 1, 1),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::DuplicateMemberNumber(_)));
        assert!(err.is_conflict());
    }
}

// ============================================================================
// Persistence Behaviour
// ============================================================================

mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_write_leaves_no_invoice() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-020", DateFixtures::ymd(2024, 2, 1)).await;

        h.port.set_fail_writes(true);
        let err = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Persistence(_)));
        assert_eq!(h.port.invoice_count().await, 0);
        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert!(stored.total_paid.is_zero());
    }

    #[tokio::test]
    async fn test_backdated_invoice_rejected() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-021", DateFixtures::ymd(2024, 2, 1)).await;

        h.invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 3, 10), dec!(0)))
            .await
            .unwrap();
        let err = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 10), dec!(0)))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(h.port.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_invoice_on_same_day_rejected() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-024", DateFixtures::ymd(2024, 2, 1)).await;

        let first = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(300)))
            .await
            .unwrap();
        assert_money_eq(&first.balance_amount, dec!(700));

        let err = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(200)))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // The next day chains to the only stored invoice
        let next = h
            .invoices
            .create_invoice(invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 6), dec!(0)))
            .await
            .unwrap();
        assert_eq!(next.previous_invoice_id, Some(first.id));
        assert_money_eq(&next.previous_balance, dec!(700));
        assert_money_eq(&next.balance_amount, dec!(700));

        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert_money_eq(&stored.total_paid, dec!(300));
        assert_invoice_chain(&h.invoices.invoice_history(enrollment.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_same_day_creation_admits_one() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Arc::new(Harness::new(vec![plan.clone()], BillingConfig::default()).await);
        let enrollment = h.enroll(&plan, "M-022", DateFixtures::ymd(2024, 2, 1)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let h = h.clone();
            let request = invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(10));
            handles.push(tokio::spawn(async move { h.invoices.create_invoice(request).await }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(err.is_conflict(), "unexpected error: {err}"),
            }
        }
        assert_eq!(created, 1);

        let history = h.invoices.invoice_history(enrollment.id).await.unwrap();
        assert_eq!(history.len(), 1);
        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert_money_eq(&stored.total_paid, dec!(10));
    }

    #[tokio::test]
    async fn test_concurrent_creation_allocates_distinct_numbers() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Arc::new(Harness::new(vec![plan.clone()], BillingConfig::default()).await);

        let mut handles = Vec::new();
        for i in 0..8 {
            let enrollment = h
                .enroll(&plan, &format!("M-1{i:02}"), DateFixtures::ymd(2024, 2, 1))
                .await;
            let h = h.clone();
            let request = invoice_request(&enrollment, DateFixtures::ymd(2024, 2, 5), dec!(10));
            handles.push(tokio::spawn(async move { h.invoices.create_invoice(request).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 8);
        assert_eq!(h.port.invoice_count().await, 8);
    }

    #[tokio::test]
    async fn test_history_is_in_date_order() {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = h.enroll(&plan, "M-023", DateFixtures::ymd(2024, 2, 1)).await;

        for on in [DateFixtures::ymd(2024, 2, 5), DateFixtures::ymd(2024, 2, 21), DateFixtures::ymd(2024, 3, 5)] {
            h.invoices
                .create_invoice(invoice_request(&enrollment, on, dec!(0)))
                .await
                .unwrap();
        }

        let history = h.invoices.invoice_history(enrollment.id).await.unwrap();
        assert_invoice_chain(&history);
        let dates: Vec<_> = history.into_iter().map(|i| i.invoice_date).collect();
        assert_eq!(dates, vec![DateFixtures::ymd(2024, 2, 5), DateFixtures::ymd(2024, 2, 21), DateFixtures::ymd(2024, 3, 5)]);
    }
}

// ============================================================================
// Arrear Refresh and Seeding
// ============================================================================

mod refresh_tests {
    use super::*;

    async fn three_states() -> (Harness, [Enrollment; 3]) {
        let plan = PlanFixtures::flat(12, dec!(1000));
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;

        let fresh = h.enroll(&plan, "M-030", DateFixtures::ymd(2024, 1, 1)).await;
        let due_one = h.enroll(&plan, "M-031", DateFixtures::ymd(2024, 1, 1)).await;
        let due_two = h.enroll(&plan, "M-032", DateFixtures::ymd(2024, 1, 1)).await;

        h.invoices
            .create_invoice(invoice_request(&due_one, DateFixtures::ymd(2024, 1, 10), dec!(400)))
            .await
            .unwrap();
        h.invoices
            .create_invoice(invoice_request(&due_two, DateFixtures::ymd(2024, 2, 10), dec!(100)))
            .await
            .unwrap();

        (h, [fresh, due_one, due_two])
    }

    #[tokio::test]
    async fn test_ordinary_day_skips_everything() {
        let (h, enrollments) = three_states().await;
        let report = h.refresh.refresh(DateFixtures::ymd(2024, 2, 14), false).await.unwrap();

        assert!(report.updated.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.skipped.len(), enrollments.len());
    }

    #[tokio::test]
    async fn test_month_end_writes_due_one_and_fresh() {
        let (h, [fresh, due_one, due_two]) = three_states().await;
        let report = h.refresh.refresh(DateFixtures::leap_month_end(), false).await.unwrap();

        let updated: Vec<_> = report.updated.iter().map(|e| e.enrollment_id).collect();
        assert!(updated.contains(&fresh.id));
        assert!(updated.contains(&due_one.id));
        assert!(!updated.contains(&due_two.id));

        let stored = h.port.get_enrollment(due_one.id).await.unwrap();
        assert_eq!(stored.current_arrear, MoneyFixtures::inr(dec!(600)));
        assert!(stored.arrear_last_updated.is_some());
    }

    #[tokio::test]
    async fn test_reset_day_writes_due_two_plus() {
        let (h, [_, _, due_two]) = three_states().await;
        let report = h.refresh.refresh(DateFixtures::ymd(2024, 3, 21), false).await.unwrap();

        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].enrollment_id, due_two.id);
        assert_eq!(report.updated[0].state, RefreshState::DueTwoPlusPending);
        assert_eq!(report.updated[0].arrear, MoneyFixtures::inr(dec!(900)));
    }

    #[tokio::test]
    async fn test_force_writes_everything() {
        let (h, enrollments) = three_states().await;
        let report = h.refresh.refresh(DateFixtures::ymd(2024, 2, 14), true).await.unwrap();
        assert_eq!(report.updated.len(), enrollments.len());
        assert!(report.skipped.is_empty());
        assert!(h.invoices.locks().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let (h, enrollments) = three_states().await;
        h.port.set_fail_writes(true);

        let report = h.refresh.refresh(DateFixtures::ymd(2024, 2, 14), true).await.unwrap();
        assert!(report.updated.is_empty());
        assert_eq!(report.errors.len(), enrollments.len());
    }

    #[tokio::test]
    async fn test_seeding_never_feeds_invoice_assembly() {
        let (h, [fresh, _, _]) = three_states().await;

        let seed = h.refresh.seed_initial_arrears().await.unwrap();
        assert_eq!(seed.seeded.len(), 1);
        assert_eq!(seed.seeded[0].enrollment_id, fresh.id);
        assert_eq!(seed.skipped.len(), 2);

        let stored = h.port.get_enrollment(fresh.id).await.unwrap();
        assert_eq!(stored.current_arrear, MoneyFixtures::installment());

        let invoice = h
            .invoices
            .create_invoice(invoice_request(&fresh, DateFixtures::ymd(2024, 2, 21), dec!(0)))
            .await
            .unwrap();
        assert_money_zero(&invoice.arrear_amount);
    }
}

// ============================================================================
// Stored Chains
// ============================================================================

mod stored_chain_tests {
    use super::*;
    use test_utils::{TestEnrollmentBuilder, TestInvoiceBuilder};

    async fn store(builder: TestEnrollmentBuilder) -> (Harness, Enrollment) {
        let plan = TestPlanBuilder::new().with_duration(12).build();
        let h = Harness::new(vec![plan.clone()], BillingConfig::default()).await;
        let enrollment = builder.build(&plan);
        h.port.create_enrollment(&enrollment).await.unwrap();
        (h, enrollment)
    }

    async fn stored_enrollment() -> (Harness, Enrollment) {
        store(
            TestEnrollmentBuilder::new()
                .with_member_number("M-040")
                .with_start_date(DateFixtures::enrollment_start()),
        )
        .await
    }

    #[tokio::test]
    async fn test_month_end_refresh_replaces_seeded_arrear() {
        let (h, enrollment) = store(TestEnrollmentBuilder::new().with_current_arrear(dec!(250))).await;

        let report = h.refresh.refresh(DateFixtures::leap_month_end(), false).await.unwrap();
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].state, RefreshState::NoInvoiceYet);

        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert_money_zero(&stored.current_arrear);
    }

    #[tokio::test]
    async fn test_refresh_reads_stored_chain_head() {
        let (h, enrollment) = stored_enrollment().await;

        let first = TestInvoiceBuilder::for_enrollment(&enrollment)
            .on(DateFixtures::carry_day())
            .with_received(dec!(400))
            .with_balance(dec!(600))
            .build();
        let second = TestInvoiceBuilder::for_enrollment(&enrollment)
            .with_invoice_number("000002")
            .on(DateFixtures::reset_day())
            .with_due_number(3)
            .with_arrear(dec!(600))
            .with_balance(dec!(1600))
            .after(&first)
            .build();
        h.port.record_invoice(&first).await.unwrap();
        h.port.record_invoice(&second).await.unwrap();

        let report = h.refresh.refresh(DateFixtures::ymd(2024, 4, 21), false).await.unwrap();
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].state, RefreshState::DueTwoPlusPending);
        assert_money_eq(&report.updated[0].arrear, dec!(1600));

        let stored = h.port.get_enrollment(enrollment.id).await.unwrap();
        assert_money_eq(&stored.total_paid, dec!(400));
        assert_money_eq(&stored.current_arrear, dec!(1600));
    }

    #[tokio::test]
    async fn test_port_rejects_invoice_on_chain_head_date() {
        let (h, enrollment) = stored_enrollment().await;

        let head = TestInvoiceBuilder::for_enrollment(&enrollment)
            .on(DateFixtures::cutoff_day())
            .build();
        h.port.record_invoice(&head).await.unwrap();

        let same_day = TestInvoiceBuilder::for_enrollment(&enrollment)
            .with_invoice_number("000002")
            .on(DateFixtures::cutoff_day())
            .after(&head)
            .build();
        let err = h.port.record_invoice(&same_day).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(h.port.invoice_count().await, 1);
    }
}

// ============================================================================
// Calculator Properties
// ============================================================================

mod calculator_props {
    use super::*;
    use domain_billing::{
        calculate_balance, calculate_due_number, validate_manual_due_number, BalanceInputs,
        BalancePolicy,
    };
    use proptest::prelude::*;
    use test_utils::{
        amount_strategy, assert_money_non_negative, carry_day_strategy, duration_strategy,
        enrollment_and_invoice_dates, inr_strategy, reset_day_strategy,
    };

    fn inputs(due: Decimal, arrear: Decimal, received: Decimal, previous: Decimal) -> BalanceInputs {
        BalanceInputs {
            due_amount: MoneyFixtures::inr(due),
            arrear_amount: MoneyFixtures::inr(arrear),
            received_amount: MoneyFixtures::inr(received),
            received_arrear_amount: MoneyFixtures::zero(),
            previous_balance: MoneyFixtures::inr(previous),
        }
    }

    proptest! {
        #[test]
        fn prop_due_number_starts_at_one((start, invoice) in enrollment_and_invoice_dates()) {
            let due_number = calculate_due_number(start, invoice, 200).unwrap();
            prop_assert!(due_number >= 1);
        }

        #[test]
        fn prop_manual_due_number_range(duration in duration_strategy(), due_number in -5i64..=70) {
            let accepted = validate_manual_due_number(due_number, duration).is_ok();
            prop_assert_eq!(accepted, due_number >= 1 && due_number <= i64::from(duration));
        }

        #[test]
        fn prop_reset_day_ignores_previous_balance(
            day in reset_day_strategy(),
            due in amount_strategy(),
            arrear in amount_strategy(),
            received in amount_strategy(),
            previous in amount_strategy(),
        ) {
            let balance = calculate_balance(
                &inputs(due, arrear, received, previous),
                BillingPhase::for_date(day),
                BalancePolicy::AllowNegative,
            )
            .unwrap();
            prop_assert_eq!(balance.amount(), due + arrear - received);
        }

        #[test]
        fn prop_carry_day_ignores_arrear(
            day in carry_day_strategy(),
            due in amount_strategy(),
            arrear in amount_strategy(),
            received in amount_strategy(),
            previous in amount_strategy(),
        ) {
            let balance = calculate_balance(
                &inputs(due, arrear, received, previous),
                BillingPhase::for_date(day),
                BalancePolicy::AllowNegative,
            )
            .unwrap();
            prop_assert_eq!(balance.amount(), previous - received);
        }

        #[test]
        fn prop_floored_balance_never_negative(previous in inr_strategy(), received in inr_strategy()) {
            let balance = calculate_balance(
                &inputs(dec!(1000), Decimal::ZERO, received.amount(), previous.amount()),
                BillingPhase::Carry,
                BalancePolicy::FloorAtZero,
            )
            .unwrap();
            assert_money_non_negative(&balance);
        }
    }
}
