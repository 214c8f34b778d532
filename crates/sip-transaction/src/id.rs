use rand::{distributions::Alphanumeric, Rng};
use sip_core::BRANCH_MAGIC_COOKIE;
use smol_str::SmolStr;

/// Source of the opaque identifiers used for Call-IDs, tags and branches.
///
/// Injected into the user agent so tests can pin every generated value.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> SmolStr;

    /// New RFC 3261 branch: the magic cookie followed by a fresh id.
    fn next_branch(&self) -> SmolStr {
        SmolStr::new(format!("{}{}", BRANCH_MAGIC_COOKIE, self.next_id()))
    }
}

/// Default generator producing 16 random alphanumeric characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> SmolStr {
        let mut rng = rand::thread_rng();
        let id: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        SmolStr::new(id)
    }
}
