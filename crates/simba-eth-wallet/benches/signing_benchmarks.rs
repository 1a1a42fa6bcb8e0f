use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use simba_eth_wallet::{Account, HdWallet, Signer};

const KEY: &str = "1837c1be8e2995ec11cda2b066151be2cfb48adf9e47b151d46adab3a21cdf67";

fn bench_sign_legacy_transaction(c: &mut Criterion) {
    let account = Account::from_private_key(KEY).unwrap();
    let tx = json!({
        "chainId": "0x1",
        "to": "0xa508dD875f10C33C52a8abb20E16fc68E981F186",
        "value": 0,
        "gas": "0x5d6a",
        "gasPrice": "0x3b9aca00",
        "data": "0xdb7eff7c00000000",
        "nonce": "0x2",
    });
    c.bench_function("sign_legacy_transaction", |b| {
        b.iter(|| account.sign_transaction(&tx).unwrap());
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let account = Account::from_private_key(KEY).unwrap();
    c.bench_function("sign_personal_message", |b| {
        b.iter(|| account.sign_message("hello").unwrap());
    });
}

fn bench_mnemonic_load(c: &mut Criterion) {
    let words = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    c.bench_function("hdwallet_load_mnemonic", |b| {
        b.iter_with_setup(HdWallet::new, |mut wallet| {
            wallet.generate_from_mnemonic(Some(words)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_sign_legacy_transaction,
    bench_sign_message,
    bench_mnemonic_load
);
criterion_main!(benches);
