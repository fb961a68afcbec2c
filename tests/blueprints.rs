//! Shipped blueprints driven end to end.

mod common;

use blueprint_runtime::blueprints::{FaucetInit, SpawnFaucet, TokenManagerInit};
use blueprint_runtime::contracts::{decode, IndexRecord};
use blueprint_runtime::{Action, Address, Caller, ContractId, NcError, TokenUid, TxInputs};

use common::{args, Forward, Harness};

const HTR: TokenUid = TokenUid::NATIVE;

fn manager_init(initial_supply: u64) -> TokenManagerInit {
    TokenManagerInit {
        name: "Manager Token".to_string(),
        symbol: "MGR".to_string(),
        initial_supply,
        mint_authority: true,
        melt_authority: true,
    }
}

fn fail_message(error: &NcError) -> &str {
    match error {
        NcError::Fail(msg) => msg.as_str(),
        other => panic!("expected a blueprint failure, got {other:?}"),
    }
}

/// Token manager with `supply` tokens and 200 native units
fn setup_manager(h: &mut Harness, supply: u64) -> (ContractId, TokenUid) {
    let receipt = h
        .try_create(h.natives.token_manager, args(&manager_init(supply)), 200)
        .unwrap();
    let manager = receipt.contract_id.unwrap();
    let token: TokenUid = decode(&receipt.output).unwrap();
    (manager, token)
}

fn spawn_faucet(h: &mut Harness, manager: ContractId, amount: u64, max_withdrawal: u64) -> ContractId {
    let spawn = SpawnFaucet {
        faucet_blueprint: h.natives.faucet,
        amount,
        max_withdrawal,
    };
    let receipt = h.call(manager, "spawn_faucet", args(&spawn)).unwrap();
    decode(&receipt.output).unwrap()
}

fn view<T: serde::de::DeserializeOwned>(h: &Harness, contract: ContractId, method: &str, arg: Vec<u8>) -> T {
    decode(&h.view(contract, method, arg).unwrap()).unwrap()
}

// =============================================================================
// TOKEN MANAGER
// =============================================================================

#[test]
fn test_manager_issues_token() {
    let mut h = Harness::new();
    let receipt = h
        .try_create(h.natives.token_manager, args(&manager_init(10_000)), 200)
        .unwrap();
    let manager = receipt.contract_id.unwrap();
    let token: TokenUid = decode(&receipt.output).unwrap();

    assert_eq!(h.storage.balance_of(&manager, &token), 10_000);
    assert_eq!(h.native(&manager), 100);
    assert_eq!(view::<TokenUid>(&h, manager, "get_main_token", Vec::new()), token);
    assert_eq!(
        view::<Option<Caller>>(&h, manager, "get_owner", Vec::new()),
        Some(Caller::Address(h.caller))
    );
    assert_eq!(view::<u64>(&h, manager, "get_treasury", Vec::new()), 10_000);
    assert_eq!(receipt.events.len(), 1);
    assert_eq!(receipt.events[0].topic, "token_created");
    assert!(matches!(receipt.records[0], IndexRecord::CreateContract { .. }));
    assert!(matches!(receipt.records[1], IndexRecord::CreateToken { amount: 10_000, .. }));
}

#[test]
fn test_manager_without_deposit_cannot_issue() {
    let mut h = Harness::new();
    let failure = h
        .try_create(h.natives.token_manager, args(&manager_init(10_000)), 0)
        .unwrap_err();
    assert!(matches!(failure.error, NcError::InsufficientBalance { need: 100, .. }));
    assert_eq!(h.storage.contract_count(), 0);
}

#[test]
fn test_manager_mint_melt_and_renounce() {
    let mut h = Harness::new();
    let (manager, token) = setup_manager(&mut h, 10_000);

    let receipt = h.call(manager, "mint", args(&500u64)).unwrap();
    assert_eq!(h.storage.balance_of(&manager, &token), 10_500);
    assert_eq!(h.native(&manager), 95);
    assert_eq!(receipt.events[0].topic, "minted");

    h.call(manager, "melt", args(&1_000u64)).unwrap();
    assert_eq!(h.storage.balance_of(&manager, &token), 9_500);
    assert_eq!(h.native(&manager), 105);

    h.call(manager, "renounce_authorities", args(&(true, false))).unwrap();
    let failure = h.call(manager, "mint", args(&1u64)).unwrap_err();
    assert!(matches!(failure.error, NcError::AuthorityNotHeld { .. }));
    h.call(manager, "melt", args(&1u64)).unwrap();
}

#[test]
fn test_manager_owner_withdraws_treasury() {
    let mut h = Harness::new();
    let (manager, token) = setup_manager(&mut h, 10_000);

    let receipt = h
        .call_with(
            manager,
            "withdraw",
            Vec::new(),
            vec![Action::withdrawal(token, 2_500)],
            TxInputs::default(),
        )
        .unwrap();
    assert_eq!(receipt.outputs.amount(&token), 2_500);
    assert_eq!(h.storage.balance_of(&manager, &token), 7_500);

    // tokens go back through the unrestricted deposit method
    h.call_with(
        manager,
        "deposit",
        Vec::new(),
        vec![Action::deposit(token, 500)],
        TxInputs::default().with_tokens(token, 500),
    )
    .unwrap();
    assert_eq!(h.storage.balance_of(&manager, &token), 8_000);
}

#[test]
fn test_manager_rejects_non_owner() {
    let mut h = Harness::new();
    let (manager, _) = setup_manager(&mut h, 10_000);
    let fixture = h.fixture(0);

    let failure = h
        .call(fixture, "forward", Forward::public(manager, "mint", args(&1u64), Vec::new()).encoded())
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only owner can call this method");

    h.caller = Address::from_bytes([0xBB; 20]);
    let failure = h.call(manager, "melt", args(&1u64)).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only owner can call this method");
}

// =============================================================================
// MANAGER-SPAWNED FAUCET
// =============================================================================

#[test]
fn test_spawned_faucet_flow() {
    let mut h = Harness::new();
    let (manager, token) = setup_manager(&mut h, 10_000);

    let predicted: ContractId = view(&h, manager, "preview_faucet_id", args(&h.natives.faucet));
    let faucet = spawn_faucet(&mut h, manager, 1_000, 100);
    assert_eq!(faucet, predicted);
    assert_eq!(view::<Option<ContractId>>(&h, manager, "get_faucet", Vec::new()), Some(faucet));
    assert_eq!(h.storage.balance_of(&faucet, &token), 1_000);
    assert_eq!(h.storage.balance_of(&manager, &token), 9_000);
    assert_eq!(view::<TokenUid>(&h, faucet, "get_token", Vec::new()), token);
    assert_eq!(view::<u64>(&h, faucet, "get_max_withdrawal", Vec::new()), 100);

    let receipt = h
        .call_with(faucet, "withdraw", Vec::new(), vec![Action::withdrawal(token, 60)], TxInputs::default())
        .unwrap();
    assert_eq!(receipt.outputs.amount(&token), 60);
    let withdrawn: u64 = view(&h, faucet, "get_user_withdrawal", args(&Caller::Address(h.caller)));
    assert_eq!(withdrawn, 60);

    let failure = h
        .call_with(faucet, "withdraw", Vec::new(), vec![Action::withdrawal(token, 50)], TxInputs::default())
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Withdrawal exceeds maximum allowed (100)");
    assert_eq!(h.storage.balance_of(&faucet, &token), 940);

    h.call(manager, "top_up_faucet", args(&500u64)).unwrap();
    assert_eq!(view::<u64>(&h, manager, "get_faucet_supply", Vec::new()), 1_440);
    assert_eq!(h.storage.balance_of(&faucet, &token), 1_440);

    let failure = h
        .call(
            manager,
            "spawn_faucet",
            args(&SpawnFaucet {
                faucet_blueprint: h.natives.faucet,
                amount: 1,
                max_withdrawal: 1,
            }),
        )
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Faucet already exists");
}

#[test]
fn test_spawned_faucet_is_administered_by_manager() {
    let mut h = Harness::new();
    let (manager, token) = setup_manager(&mut h, 10_000);
    let faucet = spawn_faucet(&mut h, manager, 1_000, 100);

    // the external caller is not the faucet admin
    let failure = h.call(faucet, "set_max_withdrawal", args(&500u64)).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only admin can perform this action");

    let failure = h
        .call_with(
            faucet,
            "admin_withdraw",
            Vec::new(),
            vec![Action::withdrawal(token, 10)],
            TxInputs::default(),
        )
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only admin can perform this action");
}

#[test]
fn test_spawn_faucet_rolls_back_on_overdraw() {
    let mut h = Harness::new();
    let (manager, _) = setup_manager(&mut h, 1_000);
    let before = h.storage.clone();

    let spawn = SpawnFaucet {
        faucet_blueprint: h.natives.faucet,
        amount: 5_000,
        max_withdrawal: 10,
    };
    let failure = h.call(manager, "spawn_faucet", args(&spawn)).unwrap_err();
    assert!(matches!(failure.error, NcError::InsufficientFunds { need: 5_000, have: 1_000, .. }));
    assert_eq!(h.storage, before);
    assert_eq!(view::<Option<ContractId>>(&h, manager, "get_faucet", Vec::new()), None);
}

// =============================================================================
// STANDALONE FAUCET
// =============================================================================

fn native_faucet(h: &mut Harness, supply: u64, max_withdrawal: u64) -> ContractId {
    let init = FaucetInit {
        token: HTR,
        max_withdrawal,
    };
    h.create(h.natives.faucet, args(&init), supply)
}

#[test]
fn test_faucet_admin_flows() {
    let mut h = Harness::new();
    let faucet = native_faucet(&mut h, 500, 50);
    assert_eq!(view::<u64>(&h, faucet, "get_total_supply", Vec::new()), 500);

    h.call(faucet, "set_max_withdrawal", args(&80u64)).unwrap();
    assert_eq!(view::<u64>(&h, faucet, "get_max_withdrawal", Vec::new()), 80);

    let failure = h.call(faucet, "set_max_withdrawal", args(&0u64)).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Max withdrawal must be positive");

    // the admin is not bound by the per-caller limit
    let receipt = h
        .call_with(
            faucet,
            "admin_withdraw",
            Vec::new(),
            vec![Action::withdrawal(HTR, 300)],
            TxInputs::default(),
        )
        .unwrap();
    assert_eq!(receipt.outputs.amount(&HTR), 300);
    assert_eq!(view::<u64>(&h, faucet, "get_total_supply", Vec::new()), 200);
    assert_eq!(h.native(&faucet), 200);

    let fixture = h.fixture(0);
    let failure = h
        .call(
            fixture,
            "forward",
            Forward::public(faucet, "set_max_withdrawal", args(&1u64), Vec::new()).encoded(),
        )
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only admin can perform this action");
}

#[test]
fn test_faucet_limits_are_per_caller() {
    let mut h = Harness::new();
    let faucet = native_faucet(&mut h, 500, 50);

    let withdraw = |h: &mut Harness, amount: u64| {
        h.call_with(
            faucet,
            "withdraw",
            Vec::new(),
            vec![Action::withdrawal(HTR, amount)],
            TxInputs::default(),
        )
    };

    withdraw(&mut h, 50).unwrap();
    assert!(withdraw(&mut h, 1).is_err());

    let first = h.caller;
    h.caller = Address::from_bytes([0xCC; 20]);
    withdraw(&mut h, 30).unwrap();

    let first_total: u64 = view(&h, faucet, "get_user_withdrawal", args(&Caller::Address(first)));
    let second_total: u64 = view(&h, faucet, "get_user_withdrawal", args(&Caller::Address(h.caller)));
    assert_eq!((first_total, second_total), (50, 30));
    assert_eq!(view::<u64>(&h, faucet, "get_total_supply", Vec::new()), 420);
}

#[test]
fn test_faucet_deposits() {
    let mut h = Harness::new();
    let faucet = native_faucet(&mut h, 100, 10);
    let other = TokenUid::from_bytes([3u8; 32]);

    h.call_with(
        faucet,
        "deposit",
        Vec::new(),
        vec![Action::deposit(HTR, 25)],
        TxInputs::default().with_tokens(HTR, 25),
    )
    .unwrap();
    assert_eq!(view::<u64>(&h, faucet, "get_total_supply", Vec::new()), 125);

    let failure = h
        .call_with(
            faucet,
            "deposit",
            Vec::new(),
            vec![Action::deposit(other, 5)],
            TxInputs::default().with_tokens(other, 5),
        )
        .unwrap_err();
    assert_eq!(fail_message(&failure.error), "Invalid token");

    let failure = h.call(faucet, "deposit", Vec::new()).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only one action allowed");

    let failure = h
        .call_with(faucet, "withdraw", Vec::new(), vec![Action::withdrawal(HTR, 200)], TxInputs::default())
        .unwrap_err();
    assert!(matches!(failure.error, NcError::InsufficientBalance { .. }));
}

#[test]
fn test_faucet_initialize_checks_deposit() {
    let mut h = Harness::new();

    let wrong = FaucetInit {
        token: TokenUid::from_bytes([3u8; 32]),
        max_withdrawal: 10,
    };
    let failure = h.try_create(h.natives.faucet, args(&wrong), 100).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Invalid deposit");

    let init = FaucetInit {
        token: HTR,
        max_withdrawal: 10,
    };
    let failure = h.try_create(h.natives.faucet, args(&init), 0).unwrap_err();
    assert_eq!(fail_message(&failure.error), "Only one action allowed");
    assert_eq!(h.storage.contract_count(), 0);
}
