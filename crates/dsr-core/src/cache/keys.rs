use dsr_masking::SecretType;

pub fn identity_prefix(privacy_request_id: &str) -> String {
    format!("id-{privacy_request_id}-identity-")
}

pub fn identity_key(privacy_request_id: &str, identity: &str) -> String {
    format!("{}{identity}", identity_prefix(privacy_request_id))
}

pub fn masking_secret_key(privacy_request_id: &str, strategy: &str, secret_type: SecretType) -> String {
    format!("id-{privacy_request_id}-masking-secret-{strategy}-{secret_type}")
}

pub fn checkpoint_key(privacy_request_id: &str) -> String {
    format!("id-{privacy_request_id}-traversal-checkpoint")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(identity_key("pri_1", "email"), "id-pri_1-identity-email");
        assert_eq!(masking_secret_key("pri_1", "hash", SecretType::Salt), "id-pri_1-masking-secret-hash-salt");
    }
}
