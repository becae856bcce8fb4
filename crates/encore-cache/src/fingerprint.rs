use serde::Serialize;
use serde_json::Value;

use crate::error::CacheResult;

/// The cache identity of a specific call: a digest over the stable function
/// name and the canonical serialization of the call arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of<A: Serialize>(name: &str, args: &A) -> CacheResult<Self> {
        Ok(Self::of_value(name, &serde_json::to_value(args)?))
    }

    /// Derive the fingerprint from already-serialized arguments.
    pub fn of_value(name: &str, args: &Value) -> Self {
        let arguments = args.to_string();
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(arguments.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = Fingerprint::of("math.add", &(1, 2)).unwrap();
        let b = Fingerprint::of("math.add", &(1, 2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_depends_on_name_and_arguments() {
        let a = Fingerprint::of("math.add", &(1, 2)).unwrap();
        let b = Fingerprint::of("math.mul", &(1, 2)).unwrap();
        let c = Fingerprint::of("math.add", &(1, 3)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_of_value_matches_of() {
        let a = Fingerprint::of("math.add", &(1, 2)).unwrap();
        let b = Fingerprint::of_value("math.add", &serde_json::json!([1, 2]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_displays_as_hex() {
        let fingerprint = Fingerprint::of("math.add", &(1, 2)).unwrap();
        let hex = fingerprint.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_rejects_unserializable_arguments() {
        let result = Fingerprint::of("math.add", &f64::NAN);
        assert!(result.is_err());
    }
}
