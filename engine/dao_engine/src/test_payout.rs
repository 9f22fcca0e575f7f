use std::sync::Arc;
use std::thread;

use crate::invariants::{assert_all_invariants, ProposalHistory};
use crate::{
    Address, Amount, DaoError, DaoEvent, Engine, GovernanceConfig, InMemorySettlement,
    ProposalStatus, UNIT,
};

fn setup_with(config: GovernanceConfig) -> (Engine, Arc<InMemorySettlement>) {
    let settlement = Arc::new(InMemorySettlement::new());
    let engine = Engine::new(config, settlement.clone()).unwrap();
    (engine, settlement)
}

fn setup() -> (Engine, Arc<InMemorySettlement>) {
    setup_with(GovernanceConfig::default())
}

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn milli(n: Amount) -> Amount {
    n * UNIT / 1000
}

fn deployer() -> Address {
    addr(0x0d)
}

fn beneficiary() -> Address {
    addr(0x0b)
}

/// Deployer contributes 0.5 and raises an upvoted proposal for `amount`.
fn upvoted_proposal(engine: &Engine, amount: Amount) {
    engine.contribute(&deployer(), milli(500)).unwrap();
    engine
        .create_proposal(&deployer(), "title", "desc", beneficiary(), amount)
        .unwrap();
    engine.perform_vote(&deployer(), 0, true).unwrap();
}

#[test]
fn test_pays_beneficiary() {
    let (engine, settlement) = setup();
    let mut history = ProposalHistory::new();
    upvoted_proposal(&engine, milli(20));
    history.observe(&engine);
    assert_eq!(engine.total_balance(), milli(500));

    let receipt = engine.pay_beneficiary(&deployer(), 0).unwrap();
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Paid);
    assert_eq!(receipt.beneficiary, beneficiary());
    assert_eq!(receipt.amount, milli(20));
    assert_eq!(receipt.remaining_balance, milli(480));

    assert_eq!(engine.total_balance(), milli(480));
    assert_eq!(engine.get_proposal(0).unwrap().status, ProposalStatus::Paid);
    assert_eq!(settlement.credited_to(&beneficiary()), milli(20));
    // contributions are not reduced by payouts
    assert_eq!(engine.balance_of(&deployer()), milli(500));
}

#[test]
fn test_second_payment_rejected() {
    let (engine, settlement) = setup();
    upvoted_proposal(&engine, milli(20));
    engine.pay_beneficiary(&deployer(), 0).unwrap();

    assert_eq!(
        engine.pay_beneficiary(&deployer(), 0).unwrap_err(),
        DaoError::InvalidState {
            proposal_id: 0,
            status: ProposalStatus::Paid,
            operation: "pay",
        }
    );
    assert_eq!(engine.total_balance(), milli(480));
    assert_eq!(settlement.total_credited(), milli(20));
}

#[test]
fn test_payment_requires_passing_vote() {
    let (engine, _) = setup();
    engine.contribute(&deployer(), milli(500)).unwrap();
    engine
        .create_proposal(&deployer(), "title", "desc", beneficiary(), milli(20))
        .unwrap();

    // no votes at all
    assert!(matches!(
        engine.pay_beneficiary(&deployer(), 0),
        Err(DaoError::VoteNotPassed {
            upvotes: 0,
            downvotes: 0,
            ..
        })
    ));

    engine.perform_vote(&deployer(), 0, false).unwrap();
    assert!(matches!(
        engine.pay_beneficiary(&deployer(), 0),
        Err(DaoError::VoteNotPassed { downvotes: 1, .. })
    ));
    assert_eq!(engine.get_proposal(0).unwrap().status, ProposalStatus::Open);
    assert_eq!(engine.total_balance(), milli(500));
}

#[test]
fn test_tied_vote_does_not_pay() {
    let (engine, _) = setup();
    upvoted_proposal(&engine, milli(20));
    engine.contribute(&addr(0x03), UNIT).unwrap();
    engine.perform_vote(&addr(0x03), 0, false).unwrap();
    assert!(matches!(
        engine.pay_beneficiary(&deployer(), 0),
        Err(DaoError::VoteNotPassed { .. })
    ));
}

#[test]
fn test_payment_requires_quorum() {
    let (engine, _) = setup_with(GovernanceConfig::default().with_quorum(2));
    upvoted_proposal(&engine, milli(20));
    assert!(matches!(
        engine.pay_beneficiary(&deployer(), 0),
        Err(DaoError::VoteNotPassed { quorum: 2, .. })
    ));

    engine.contribute(&addr(0x03), UNIT).unwrap();
    engine.perform_vote(&addr(0x03), 0, true).unwrap();
    assert!(engine.pay_beneficiary(&deployer(), 0).is_ok());
}

#[test]
fn test_insufficient_funds_leaves_proposal_open() {
    let (engine, settlement) = setup();
    let mut history = ProposalHistory::new();
    upvoted_proposal(&engine, 4 * UNIT);
    history.observe(&engine);

    assert_eq!(
        engine.pay_beneficiary(&deployer(), 0).unwrap_err(),
        DaoError::InsufficientFunds {
            requested: 4 * UNIT,
            available: milli(500),
        }
    );
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Open);
    assert_eq!(settlement.total_credited(), 0);

    // becomes payable once the treasury catches up
    engine.contribute(&addr(0x03), 4 * UNIT).unwrap();
    history.observe(&engine);
    let receipt = engine.pay_beneficiary(&deployer(), 0).unwrap();
    history.observe(&engine);
    assert_eq!(receipt.remaining_balance, milli(500));
}

#[test]
fn test_payment_drains_treasury_exactly() {
    let (engine, _) = setup();
    upvoted_proposal(&engine, milli(500));
    engine.pay_beneficiary(&deployer(), 0).unwrap();
    assert_eq!(engine.total_balance(), 0);
}

#[test]
fn test_failed_transfer_rolls_back() {
    let (engine, settlement) = setup();
    let mut history = ProposalHistory::new();
    upvoted_proposal(&engine, milli(20));
    settlement.reject(&beneficiary());
    history.observe(&engine);
    let events_before = engine.event_count();

    let err = engine.pay_beneficiary(&deployer(), 0).unwrap_err();
    assert!(matches!(err, DaoError::TransferFailed { amount, .. } if amount == milli(20)));
    history.observe(&engine);

    assert_eq!(engine.total_balance(), milli(500));
    assert_eq!(history.status(0), ProposalStatus::Open);
    assert_eq!(engine.event_count(), events_before);
    assert_eq!(engine.snapshot().total_paid_out, 0);

    // the caller may retry once the beneficiary accepts transfers
    settlement.accept(&beneficiary());
    engine.pay_beneficiary(&deployer(), 0).unwrap();
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Paid);
    assert_eq!(settlement.credited_to(&beneficiary()), milli(20));
}

#[test]
fn test_failed_transfer_restores_passed_status() {
    let (engine, settlement) = setup();
    upvoted_proposal(&engine, milli(20));
    engine.finalize_proposal(&deployer(), 0).unwrap();
    settlement.reject(&beneficiary());

    assert!(engine.pay_beneficiary(&deployer(), 0).is_err());
    assert_eq!(engine.get_proposal(0).unwrap().status, ProposalStatus::Passed);
}

#[test]
fn test_pays_finalized_proposal() {
    let (engine, _) = setup();
    let mut history = ProposalHistory::new();
    upvoted_proposal(&engine, milli(20));
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Open);

    assert_eq!(
        engine.finalize_proposal(&deployer(), 0),
        Ok(ProposalStatus::Passed)
    );
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Passed);

    engine.pay_beneficiary(&deployer(), 0).unwrap();
    history.observe(&engine);
    assert_eq!(history.status(0), ProposalStatus::Paid);
}

#[test]
fn test_failed_proposal_cannot_be_paid() {
    let (engine, _) = setup();
    engine.contribute(&deployer(), milli(500)).unwrap();
    engine
        .create_proposal(&deployer(), "title", "desc", beneficiary(), milli(20))
        .unwrap();
    engine.finalize_proposal(&deployer(), 0).unwrap();

    assert!(matches!(
        engine.pay_beneficiary(&deployer(), 0),
        Err(DaoError::InvalidState {
            status: ProposalStatus::Failed,
            ..
        })
    ));
}

#[test]
fn test_contributor_cannot_trigger_payment() {
    let (engine, _) = setup();
    upvoted_proposal(&engine, milli(20));
    engine.contribute(&addr(0x02), milli(50)).unwrap();

    assert!(matches!(
        engine.pay_beneficiary(&addr(0x02), 0),
        Err(DaoError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.pay_beneficiary(&beneficiary(), 0),
        Err(DaoError::Unauthorized { .. })
    ));
}

#[test]
fn test_any_stakeholder_may_trigger_payment() {
    let (engine, _) = setup();
    upvoted_proposal(&engine, milli(20));
    engine.contribute(&addr(0x03), UNIT).unwrap();
    let receipt = engine.pay_beneficiary(&addr(0x03), 0).unwrap();
    assert_eq!(receipt.proposal_id, 0);

    let last = engine.events_since(0, usize::MAX).pop().unwrap();
    match last.event {
        DaoEvent::ProposalPaid(action) => assert_eq!(action.actor, addr(0x03)),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_pay_unknown_proposal_not_found() {
    let (engine, _) = setup();
    engine.contribute(&deployer(), milli(500)).unwrap();
    assert_eq!(
        engine.pay_beneficiary(&deployer(), 0).unwrap_err(),
        DaoError::NotFound(0)
    );
}

#[test]
fn test_concurrent_contributions_are_serialized() {
    let (engine, _) = setup();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (1..=8u8)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    engine.contribute(&addr(n), milli(10)).unwrap();
                    let snap = engine.snapshot();
                    assert_eq!(snap.total_balance, snap.total_contributed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.total_balance(), 8 * 50 * milli(10));
    assert_eq!(engine.event_count(), 400);
    for n in 1..=8u8 {
        assert_eq!(engine.balance_of(&addr(n)), 50 * milli(10));
    }
    assert_all_invariants(&engine);
}

#[test]
fn test_concurrent_votes_accept_exactly_one_per_voter() {
    let (engine, _) = setup();
    upvoted_proposal(&engine, milli(20));
    let voter = addr(0x03);
    engine.contribute(&voter, UNIT).unwrap();
    let engine = Arc::new(engine);

    let accepted: usize = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let voter = voter.clone();
            thread::spawn(move || engine.perform_vote(&voter, 0, i % 2 == 0).is_ok())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(accepted, 1);
    assert_eq!(engine.proposal_votes(0).unwrap().len(), 2);
}
