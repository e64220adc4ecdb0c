use bitcoin::blockdata::script::Script;
use bitcoin::network::constants::Network;
use bitcoin::util::address::Address;
use bitcoin::PublicKey;
use std::str::FromStr;

/// Destination of a locking script.
///
/// Standard templates carry the address they pay to; scripts without one
/// are their own variants so callers must decide what "no address" means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptClassification {
    P2PKH(String),
    P2SH(String),
    /// Bare public key, attributed to the key's P2PKH address
    P2PK(String),
    WitnessKeyHash(String),
    WitnessScriptHash(String),
    WitnessUnknown(String),
    NullData,
    Nonstandard,
}

impl ScriptClassification {
    pub fn address(&self) -> Option<&str> {
        match self {
            ScriptClassification::P2PKH(a)
            | ScriptClassification::P2SH(a)
            | ScriptClassification::P2PK(a)
            | ScriptClassification::WitnessKeyHash(a)
            | ScriptClassification::WitnessScriptHash(a)
            | ScriptClassification::WitnessUnknown(a) => Some(a),
            ScriptClassification::NullData | ScriptClassification::Nonstandard => None,
        }
    }

    pub fn pays_to(&self, address: &str) -> bool {
        self.address() == Some(address)
    }

    /// Script type name as used in the `scriptPubKey.type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptClassification::P2PKH(_) => "pubkeyhash",
            ScriptClassification::P2SH(_) => "scripthash",
            ScriptClassification::P2PK(_) => "pubkey",
            ScriptClassification::WitnessKeyHash(_) => "witnesspubkeyhash",
            ScriptClassification::WitnessScriptHash(_) => "witnessscripthash",
            ScriptClassification::WitnessUnknown(_) => "witnessunknown",
            ScriptClassification::NullData => "nulldata",
            ScriptClassification::Nonstandard => "nonstandard",
        }
    }
}

/// Classify a raw scriptPubKey and derive its address for `network`.
pub fn classify_script(script: &[u8], network: Network) -> ScriptClassification {
    let s = Script::from(script.to_vec());

    if s.is_op_return() {
        return ScriptClassification::NullData;
    }

    if s.is_p2pk() {
        // <push len> <pubkey> OP_CHECKSIG
        let key_bytes = &script[1..script.len() - 1];
        return match PublicKey::from_slice(key_bytes) {
            Ok(pk) => ScriptClassification::P2PK(Address::p2pkh(&pk, network).to_string()),
            Err(_) => ScriptClassification::Nonstandard,
        };
    }

    let address = match Address::from_script(&s, network) {
        Some(addr) => addr.to_string(),
        None => return ScriptClassification::Nonstandard,
    };

    if s.is_p2pkh() {
        ScriptClassification::P2PKH(address)
    } else if s.is_p2sh() {
        ScriptClassification::P2SH(address)
    } else if s.is_v0_p2wpkh() {
        ScriptClassification::WitnessKeyHash(address)
    } else if s.is_v0_p2wsh() {
        ScriptClassification::WitnessScriptHash(address)
    } else {
        ScriptClassification::WitnessUnknown(address)
    }
}

/// Parse a network name as written in config files.
pub fn parse_network(name: &str) -> Option<Network> {
    match name.to_ascii_lowercase().as_str() {
        "main" | "mainnet" | "bitcoin" => Some(Network::Bitcoin),
        "testnet" | "test" => Some(Network::Testnet),
        "regtest" => Some(Network::Regtest),
        _ => None,
    }
}

/// Check that `address` parses and belongs to `network`.
///
/// Base58 addresses do not distinguish testnet from regtest, so any test
/// network accepts them.
pub fn is_valid_address(address: &str, network: Network) -> bool {
    let parsed = match Address::from_str(address) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    match network {
        Network::Bitcoin => parsed.network == Network::Bitcoin,
        _ => parsed.network != Network::Bitcoin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2pkh(hash160: &str) -> Vec<u8> {
        hex::decode(format!("76a914{}88ac", hash160)).unwrap()
    }

    #[test]
    fn test_p2pkh_testnet_address() {
        let script = p2pkh("0b53f448eba75639c312f9c3ea8b70d5ba3dd6de");
        let class = classify_script(&script, Network::Testnet);
        assert_eq!(
            class,
            ScriptClassification::P2PKH("mgYrJQYubixiBDUYT7xBRoJcsEEsnS9Ncb".to_string())
        );
        assert_eq!(class.type_name(), "pubkeyhash");
        assert!(class.pays_to("mgYrJQYubixiBDUYT7xBRoJcsEEsnS9Ncb"));
    }

    #[test]
    fn test_p2pkh_mainnet_address() {
        let script = p2pkh("0b53f448eba75639c312f9c3ea8b70d5ba3dd6de");
        assert_eq!(
            classify_script(&script, Network::Bitcoin).address(),
            Some("122u1MTvnhXTQ6zvjYyobt6J1EeAqJsANZ")
        );
    }

    #[test]
    fn test_p2sh_testnet_address() {
        let script = hex::decode("a9142ed7faf123405b036963b817a1b64ec1493c403187").unwrap();
        let class = classify_script(&script, Network::Testnet);
        assert_eq!(
            class,
            ScriptClassification::P2SH("2MwWuogJYiB8UbuKwLqWeUMMQtjQ2cVqP9f".to_string())
        );
        assert_eq!(class.type_name(), "scripthash");
    }

    #[test]
    fn test_op_return_has_no_address() {
        let script = hex::decode("6a0568656c6c6f").unwrap();
        let class = classify_script(&script, Network::Testnet);
        assert_eq!(class, ScriptClassification::NullData);
        assert_eq!(class.address(), None);
    }

    #[test]
    fn test_garbage_is_nonstandard() {
        let class = classify_script(&[0x51, 0x52, 0x93], Network::Testnet);
        assert_eq!(class, ScriptClassification::Nonstandard);
        assert_eq!(class.type_name(), "nonstandard");
        assert_eq!(classify_script(&[], Network::Testnet), ScriptClassification::Nonstandard);
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("mgYrJQYubixiBDUYT7xBRoJcsEEsnS9Ncb", Network::Testnet));
        assert!(is_valid_address("2MwWuogJYiB8UbuKwLqWeUMMQtjQ2cVqP9f", Network::Testnet));
        assert!(!is_valid_address("mgYrJQYubixiBDUYT7xBRoJcsEEsnS9Ncb", Network::Bitcoin));
        assert!(!is_valid_address("123123", Network::Testnet));
        assert!(!is_valid_address("zzzzzzzz", Network::Testnet));
        assert!(!is_valid_address("mtUGPXnLZasdsadasfa", Network::Testnet));
    }

    #[test]
    fn test_parse_network() {
        assert_eq!(parse_network("testnet"), Some(Network::Testnet));
        assert_eq!(parse_network("MAINNET"), Some(Network::Bitcoin));
        assert_eq!(parse_network("dogecoin"), None);
    }
}
