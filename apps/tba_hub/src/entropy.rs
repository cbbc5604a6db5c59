use base64::Engine;

/// Bytes of randomness behind each issued secret (16 url-safe chars).
const SECRET_BYTES: usize = 12;

/// Source of secrets and random draws for the registry.
///
/// Injected so tests can swap in a seeded source.
pub trait Entropy: Send + Sync {
    fn fill(&self, buf: &mut [u8]);

    fn secret(&self) -> String {
        let mut b = [0u8; SECRET_BYTES];
        self.fill(&mut b);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b)
    }

    /// Uniform-enough draw from `0..n`. `n` must be non-zero.
    fn below(&self, n: u32) -> u32 {
        let mut b = [0u8; 8];
        self.fill(&mut b);
        (u64::from_be_bytes(b) % u64::from(n)) as u32
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, buf: &mut [u8]) {
        getrandom::getrandom(buf).expect("getrandom");
    }
}

pub fn shuffle<T>(e: &dyn Entropy, v: &mut [T]) {
    for i in (1..v.len()).rev() {
        let j = e.below(i as u32 + 1) as usize;
        v.swap(i, j);
    }
}

/// Deterministic xorshift source for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct SeededEntropy(std::sync::Mutex<u64>);

#[cfg(test)]
impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self(std::sync::Mutex::new(seed.max(1)))
    }
}

#[cfg(test)]
impl Entropy for SeededEntropy {
    fn fill(&self, buf: &mut [u8]) {
        let mut s = self.0.lock().unwrap();
        for b in buf.iter_mut() {
            *s ^= *s << 13;
            *s ^= *s >> 7;
            *s ^= *s << 17;
            *b = (*s >> 24) as u8;
        }
    }
}
