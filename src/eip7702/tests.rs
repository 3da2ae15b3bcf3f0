//! EIP-7702 Tests
//!
//! Fixed vectors were computed with an independent keccak/secp256k1
//! implementation over the same inputs.

#[cfg(test)]
mod tests {
    use crate::eip7702::rlp::{decode, RlpItem};
    use crate::eip7702::*;
    use crate::error::{ErrorCode, Stage};
    use crate::keys::PrivateKey;
    use crate::types::{Address, U256};

    // Hardhat dev accounts #0 and #1
    const AUTHORIZER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const SPONSOR_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    const EXECUTE_CALLDATA: &str = "b61d27f60000000000000000000000001c7d4b196cb0c7b01d743fbc6116a902379c7238000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000600000000000000000000000000000000000000000000000000000000000000044a9059cbb00000000000000000000000025b61126eed206f6470533c073ddc3b4157bb6d1000000000000000000000000000000000000000000000000000000000098968000000000000000000000000000000000000000000000000000000000";

    const SCENARIO_B_RAW: &str = "04f901b583aa36a78084773594008504a817c800830f424094f39fd6e51aad88f6f4ce6ab8827279cfffb9226680b8e4b61d27f60000000000000000000000001c7d4b196cb0c7b01d743fbc6116a902379c7238000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000600000000000000000000000000000000000000000000000000000000000000044a9059cbb00000000000000000000000025b61126eed206f6470533c073ddc3b4157bb6d1000000000000000000000000000000000000000000000000000000000098968000000000000000000000000000000000000000000000000000000000c0f85ff85d83aa36a794aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa11110580a02b56f1d27fece2d6b857297149d3d4c88de2411e09956f9d954e75f0e480796aa056e4a3fcfb4e6dac5ad8ffe5c2c13def7fcdc0d6b6ee6eb31ca16c2aaa14a37901a092c3967ba0ef462fdc20f82ec8efe88373a461b1c3d85cbe479c8826e6fd6e67a0205e345bceb4822750a748ba503bf65255d9d2d5a89b1a1e3acc64c641b90dd4";

    fn authorizer() -> PrivateKey {
        PrivateKey::from_hex(AUTHORIZER_KEY, Stage::Configuration).unwrap()
    }

    fn sponsor() -> PrivateKey {
        PrivateKey::from_hex(SPONSOR_KEY, Stage::Configuration).unwrap()
    }

    fn delegate_address() -> Address {
        "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1111".parse().unwrap()
    }

    fn hex32(s: &str) -> [u8; 32] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    fn execute_calldata() -> Vec<u8> {
        hex::decode(EXECUTE_CALLDATA).unwrap()
    }

    fn scenario_fields(nonce: u64) -> TxFields {
        TxFields {
            chain_id: chains::SEPOLIA,
            nonce,
            max_priority_fee_per_gas: 2_000_000_000,
            max_fee_per_gas: 20_000_000_000,
            gas_limit: 1_000_000,
            to: authorizer().address().unwrap(),
            value: U256::ZERO,
            data: execute_calldata(),
            access_list: Vec::new(),
        }
    }

    fn scenario_authorization() -> Authorization {
        sign_authorization(&authorizer(), chains::SEPOLIA, delegate_address(), 5).unwrap()
    }

    // === Authorization ===

    #[test]
    fn test_authorization_rlp_preimage() {
        let rlp = authorization::rlp_encode_authorization_for_signing(chains::SEPOLIA, &delegate_address(), 5);
        assert_eq!(
            hex::encode(rlp),
            "da83aa36a794aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa111105"
        );
    }

    #[test]
    fn test_scenario_a_digest_and_signature() {
        let digest = authorization_signing_hash(chains::SEPOLIA, &delegate_address(), 5);
        assert_eq!(
            hex::encode(digest),
            "99856a890bbf553de2a9b89435360279c99573b404e12e6980de91136e321d77"
        );

        let auth = scenario_authorization();
        assert_eq!(auth.chain_id, chains::SEPOLIA);
        assert_eq!(auth.address, delegate_address());
        assert_eq!(auth.nonce, 5);
        assert_eq!(auth.y_parity, 0);
        assert_eq!(auth.r, hex32("2b56f1d27fece2d6b857297149d3d4c88de2411e09956f9d954e75f0e480796a"));
        assert_eq!(auth.s, hex32("56e4a3fcfb4e6dac5ad8ffe5c2c13def7fcdc0d6b6ee6eb31ca16c2aaa14a379"));
    }

    #[test]
    fn test_sign_authorization_deterministic() {
        let first = scenario_authorization();
        let second = scenario_authorization();
        assert_eq!(first, second);
    }

    #[test]
    fn test_authorization_signer_recovery() {
        let auth = scenario_authorization();
        let recovered = recover_authorization_signer(&auth).unwrap();
        assert_eq!(recovered, authorizer().address().unwrap());
        assert!(verify_authorization(&auth, &recovered).unwrap());
    }

    #[test]
    fn test_authorization_wrong_signer_fails() {
        let auth = scenario_authorization();
        let wrong = sponsor().address().unwrap();
        assert!(!verify_authorization(&auth, &wrong).unwrap());
    }

    #[test]
    fn test_tampered_authorization_recovers_other_signer() {
        let mut auth = scenario_authorization();
        auth.nonce = 6;
        let recovered = recover_authorization_signer(&auth).unwrap();
        assert_ne!(recovered, authorizer().address().unwrap());
    }

    #[test]
    fn test_each_field_changes_digest() {
        let base = authorization_signing_hash(chains::SEPOLIA, &delegate_address(), 5);

        let other_chain = authorization_signing_hash(1, &delegate_address(), 5);
        assert_eq!(
            hex::encode(other_chain),
            "41f96604ad362279cc3278d2ca2c2c0886f5d4bb3b69e2b0334425bb7eaba55d"
        );
        let other_nonce = authorization_signing_hash(chains::SEPOLIA, &delegate_address(), 0);
        assert_eq!(
            hex::encode(other_nonce),
            "d830686666f7ee4ed919665c3da505826f3a50df017b9b06eb57556c1bd6ee01"
        );
        let other_address = authorization_signing_hash(chains::SEPOLIA, &Address([0xBB; 20]), 5);

        assert_ne!(base, other_chain);
        assert_ne!(base, other_nonce);
        assert_ne!(base, other_address);
    }

    #[test]
    fn test_zero_delegate_rejected() {
        let err = sign_authorization(&authorizer(), chains::SEPOLIA, Address::ZERO, 5).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
        assert_eq!(err.stage(), Stage::Authorization);
        assert_eq!(err.field(), Some("address"));
    }

    #[test]
    fn test_unsigned_authorization_not_recoverable() {
        let mut auth = scenario_authorization();
        auth.r = [0u8; 32];
        auth.s = [0u8; 32];
        assert!(recover_authorization_signer(&auth).is_err());
    }

    // === Building ===

    #[test]
    fn test_build_validates_gas_limit() {
        let mut fields = scenario_fields(0);
        fields.gas_limit = 0;
        let err = build(fields, vec![scenario_authorization()]).unwrap_err();
        assert_eq!(err.field(), Some("gas_limit"));
        assert_eq!(err.stage(), Stage::Assembly);
    }

    #[test]
    fn test_build_validates_fee_ordering() {
        let mut fields = scenario_fields(0);
        fields.max_fee_per_gas = 1;
        let err = build(fields, vec![scenario_authorization()]).unwrap_err();
        assert_eq!(err.field(), Some("max_fee_per_gas"));

        // Equal fees are allowed
        let mut fields = scenario_fields(0);
        fields.max_fee_per_gas = fields.max_priority_fee_per_gas;
        assert!(build(fields, vec![scenario_authorization()]).is_ok());
    }

    #[test]
    fn test_build_requires_authorization() {
        let err = build(scenario_fields(0), Vec::new()).unwrap_err();
        assert_eq!(err.field(), Some("authorization_list"));
    }

    #[test]
    fn test_build_rejects_zero_target() {
        let mut fields = scenario_fields(0);
        fields.to = Address::ZERO;
        let err = build(fields, vec![scenario_authorization()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
        assert_eq!(err.field(), Some("to"));
    }

    #[test]
    fn test_build_rejects_foreign_chain_authorization() {
        let auth = sign_authorization(&authorizer(), 1, delegate_address(), 5).unwrap();
        let err = build(scenario_fields(0), vec![auth]).unwrap_err();
        assert_eq!(err.field(), Some("authorization_list"));

        // Chain id 0 is valid on every chain
        let wildcard = sign_authorization(&authorizer(), 0, delegate_address(), 5).unwrap();
        assert!(build(scenario_fields(0), vec![wildcard]).is_ok());
    }

    #[test]
    fn test_fields_from_json_rejects_unknown_and_missing() {
        let good = r#"{
            "chain_id": 11155111, "nonce": 0,
            "max_priority_fee_per_gas": 2000000000, "max_fee_per_gas": 20000000000,
            "gas_limit": 1000000,
            "to": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "value": "0", "data": "0x"
        }"#;
        let fields = transaction::fields_from_json(good).unwrap();
        assert_eq!(fields.gas_limit, 1_000_000);
        assert!(fields.access_list.is_empty());

        let unknown = good.replace("\"nonce\": 0", "\"nonce\": 0, \"gasPrice\": 1");
        assert!(transaction::fields_from_json(&unknown).is_err());

        let missing = good.replace("\"gas_limit\": 1000000,", "");
        let err = transaction::fields_from_json(&missing).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTransaction);
    }

    #[test]
    fn test_authorization_order_preserved() {
        let first = scenario_authorization();
        let second = sign_authorization(&sponsor(), chains::SEPOLIA, Address([0xCC; 20]), 9).unwrap();
        let tx = build(scenario_fields(0), vec![first.clone(), second.clone()]).unwrap();
        assert_eq!(tx.authorization_list(), &[first.clone(), second.clone()]);

        let swapped = build(scenario_fields(0), vec![second, first]).unwrap();
        assert_ne!(transaction_signing_hash(&tx), transaction_signing_hash(&swapped));
    }

    // === Assembly ===

    #[test]
    fn test_scenario_b_sponsored_raw_transaction() {
        let tx = build(scenario_fields(0), vec![scenario_authorization()]).unwrap();
        assert_eq!(
            hex::encode(transaction_signing_hash(&tx)),
            "fff681e2c3bf6fb07ed5b37080bea4ceb693766ec8fdc8dfa753516514e5f2a1"
        );

        let signed = sign_transaction(&tx, &sponsor()).unwrap();
        assert_eq!(signed.signature.y_parity, 1);
        assert_eq!(
            signed.signature.r,
            hex32("92c3967ba0ef462fdc20f82ec8efe88373a461b1c3d85cbe479c8826e6fd6e67")
        );

        let raw = signed.raw();
        assert_eq!(raw.as_bytes()[0], 0x04);
        assert_eq!(hex::encode(raw.as_bytes()), SCENARIO_B_RAW);
        assert_eq!(
            raw.hash().to_hex(),
            "0xdf57ca234433da34d6a70d8c0e2d690e4d4efe34bb0783b2a9e0d63a79cb57d1"
        );
    }

    #[test]
    fn test_scenario_b_field_count() {
        let tx = build(scenario_fields(0), vec![scenario_authorization()]).unwrap();
        let raw = assemble_and_sign(&tx, &sponsor()).unwrap();

        let decoded = decode(&raw.as_bytes()[1..]).unwrap();
        let fields = decoded.as_list("transaction").unwrap();
        assert_eq!(fields.len(), 13);

        let auth_list = fields[9].as_list("authorization_list").unwrap();
        assert_eq!(auth_list.len(), 1);
        assert_eq!(auth_list[0].as_list("tuple").unwrap().len(), 6);
        assert_eq!(fields[8], RlpItem::List(vec![]));
    }

    #[test]
    fn test_self_sponsored_signature() {
        let tx = build(scenario_fields(0), vec![scenario_authorization()]).unwrap();
        let signed = sign_transaction(&tx, &authorizer()).unwrap();
        assert_eq!(signed.signature.y_parity, 0);
        assert_eq!(
            signed.signature.r,
            hex32("17df1266ebbdafce3349d6ec27b484a59033b4329eb869e2941896c9a019b61a")
        );
        assert_eq!(
            signed.signature.s,
            hex32("716e79ba166189cd7d1f2219b1837cc96eacd7cc5f088b04ed846e76ce4e9437")
        );
        assert_eq!(recover_transaction_signer(&signed).unwrap(), authorizer().address().unwrap());
    }

    #[test]
    fn test_modes_decode_to_same_logical_fields() {
        let auth = scenario_authorization();
        let self_tx = build(scenario_fields(4), vec![auth.clone()]).unwrap();
        let sponsored_tx = build(scenario_fields(0), vec![auth]).unwrap();

        let self_raw = assemble_and_sign(&self_tx, &authorizer()).unwrap();
        let sponsored_raw = assemble_and_sign(&sponsored_tx, &sponsor()).unwrap();

        let a = decode_raw_transaction(self_raw.as_bytes()).unwrap();
        let b = decode_raw_transaction(sponsored_raw.as_bytes()).unwrap();

        assert_eq!(a.tx.authorization_list(), b.tx.authorization_list());
        assert_eq!(a.tx.fields().to, b.tx.fields().to);
        assert_eq!(a.tx.fields().data, b.tx.fields().data);
        assert_ne!(a.tx.nonce(), b.tx.nonce());
        assert_ne!(a.signature, b.signature);

        assert_eq!(recover_transaction_signer(&a).unwrap(), authorizer().address().unwrap());
        assert_eq!(recover_transaction_signer(&b).unwrap(), sponsor().address().unwrap());
    }

    #[test]
    fn test_decode_roundtrip() {
        let tx = build(scenario_fields(0), vec![scenario_authorization()]).unwrap();
        let signed = sign_transaction(&tx, &sponsor()).unwrap();
        let decoded = decode_raw_transaction_hex(&signed.raw().to_hex()).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn test_access_list_encoded() {
        let mut fields = scenario_fields(0);
        fields.access_list.push(AccessListEntry {
            address: Address([0x11; 20]),
            storage_keys: vec![[0x22; 32]],
        });
        let tx = build(fields, vec![scenario_authorization()]).unwrap();
        let signed = sign_transaction(&tx, &sponsor()).unwrap();
        let decoded = decode_raw_transaction(signed.raw().as_bytes()).unwrap();
        assert_eq!(decoded.tx.fields().access_list.len(), 1);
        assert_eq!(decoded.tx.fields().access_list[0].storage_keys, vec![[0x22; 32]]);
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let mut raw = hex::decode(SCENARIO_B_RAW).unwrap();
        raw[0] = 0x02;
        let err = decode_raw_transaction(&raw).unwrap_err();
        assert_eq!(err.field(), Some("type"));
        assert!(decode_raw_transaction(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let raw = hex::decode(SCENARIO_B_RAW).unwrap();
        assert!(decode_raw_transaction(&raw[..raw.len() - 1]).is_err());
    }

    #[test]
    fn test_large_value_encoded_as_uint256() {
        let mut fields = scenario_fields(0);
        fields.value = U256::MAX;
        let tx = build(fields, vec![scenario_authorization()]).unwrap();
        let signed = sign_transaction(&tx, &sponsor()).unwrap();
        let decoded = decode_raw_transaction(signed.raw().as_bytes()).unwrap();
        assert_eq!(decoded.tx.fields().value, U256::MAX);
    }

    #[test]
    fn test_malformed_payer_key() {
        assert!(PrivateKey::from_bytes(&[0u8; 32], Stage::Assembly).is_err());
        let err = PrivateKey::from_hex("1234", Stage::Assembly).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SigningError);
        assert_eq!(err.stage(), Stage::Assembly);
    }

    // === Nonce convention ===

    #[test]
    fn test_self_sponsored_nonce_convention() {
        let plan = PaymentMode::SelfSponsored.nonces(4, 99).unwrap();
        assert_eq!(plan.transaction_nonce, 4);
        assert_eq!(plan.authorization_nonce, 5);
    }

    #[test]
    fn test_sponsored_nonce_convention() {
        let plan = PaymentMode::Sponsored.nonces(4, 17).unwrap();
        assert_eq!(plan.authorization_nonce, 4);
        assert_eq!(plan.transaction_nonce, 17);
    }

    #[test]
    fn test_self_sponsored_nonce_overflow() {
        assert!(PaymentMode::SelfSponsored.nonces(u64::MAX, 0).is_none());
    }
}
