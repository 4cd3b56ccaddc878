use std::time::Duration;

use spore_common::auth::ed25519::Ed25519Authenticator;
use spore_common::auth::Authenticator;
use spore_common::crypto::hash_public_key;
use spore_common::{Amount, Input, Output, Transaction, TxKind, TxResult};
use spore_ledger::Ledger;

fn key(seed: u8) -> Ed25519Authenticator {
    Ed25519Authenticator::from_bytes(&[seed; 32]).unwrap()
}

#[test]
fn snapshot_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let (alice, bob) = (key(1), key(2));

    let ledger = Ledger::new(Duration::from_secs(10));
    ledger.commit(&Transaction::mint(vec![
        Output::new(alice.public_key(), "7.25".parse().unwrap()),
        Output::new(bob.public_key(), Amount::coins(3)),
    ]));
    ledger.save(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["utxos"].as_array().unwrap().len(), 2);

    let restored = Ledger::new(Duration::from_secs(10));
    assert!(restored.load(&path).unwrap());
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.balance(&alice.public_key()), "7.25".parse().unwrap());

    // restored UTXOs are spendable
    let pay = Transaction::payment(
        vec![Input::signed(&bob)],
        vec![Output::new(alice.public_key(), Amount::coins(3))],
    );
    assert_eq!(restored.validate_and_lock(&pay), TxResult::Success);
    assert_eq!(restored.commit(&pay), TxResult::Success);
    assert_eq!(restored.balance(&alice.public_key()), "10.25".parse().unwrap());
}

#[test]
fn missing_file_leaves_ledger_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(Duration::from_secs(10));
    ledger.commit(&Transaction::mint(vec![Output::new(key(1).public_key(), Amount::coins(1))]));

    assert!(!ledger.load(dir.path().join("nope.json")).unwrap());
    assert_eq!(ledger.len(), 1);

    std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
    assert!(ledger.load(dir.path().join("bad.json")).is_err());
    assert_eq!(ledger.len(), 1);
}

#[test]
fn balance_query_is_answered_without_mutation() {
    let ledger = Ledger::new(Duration::from_secs(10));
    let alice = key(1);
    ledger.commit(&Transaction::mint(vec![Output::new(alice.public_key(), Amount::coins(10))]));
    let history = ledger.history().len();

    let query = Transaction::balance_query(&[alice.public_key(), key(9).public_key()]);
    let answer = ledger.answer_balance_query(&query);
    assert_eq!(answer.kind, TxKind::BalanceQuery);
    assert_eq!(answer.outputs[0].amount, Amount::coins(10));
    assert_eq!(answer.outputs[1].amount, Amount::ZERO);
    assert_eq!(ledger.history().len(), history);

    let hash = hash_public_key(&alice.public_key());
    assert_eq!(ledger.utxo(hash).unwrap().output.amount, Amount::coins(10));

    ledger.clear();
    assert!(ledger.is_empty());
}
