// radix.rs
use thiserror::Error;

/// Errors raised by [`RadixCodec`] construction and its checked operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadixError {
    #[error("radix factor vector is empty")]
    EmptyFactors,
    #[error("radix factor at position {index} is zero")]
    ZeroFactor { index: usize },
    #[error("product of radix factors overflows u64")]
    Overflow,
    #[error("expected {expected} digits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("digit {value} at position {index} is not below its radix {radix}")]
    DigitOutOfRange { index: usize, value: u32, radix: u32 },
    #[error("id {id} is outside a state space of size {size}")]
    IdOutOfRange { id: u64, size: u64 },
}

/// Mixed-radix positional codec. Component 0 is the most significant digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadixCodec {
    factors: Vec<u32>,
    size: u64,
}

impl RadixCodec {
    /// Builds a codec for the given radices. Every factor must be at least 1
    /// and their product must fit in a `u64`.
    pub fn new(factors: Vec<u32>) -> Result<Self, RadixError> {
        if factors.is_empty() {
            return Err(RadixError::EmptyFactors);
        }
        let mut size: u64 = 1;
        for (index, &radix) in factors.iter().enumerate() {
            if radix == 0 {
                return Err(RadixError::ZeroFactor { index });
            }
            size = size
                .checked_mul(u64::from(radix))
                .ok_or(RadixError::Overflow)?;
        }
        Ok(Self { factors, size })
    }

    pub fn factors(&self) -> &[u32] {
        &self.factors
    }

    /// Number of distinct ids, i.e. the product of all radices.
    pub fn state_space_size(&self) -> u64 {
        self.size
    }

    /// Packs `values` into one id.
    ///
    /// Callers must discretize first: every digit has to be below its radix.
    /// This is only asserted in debug builds, see [`RadixCodec::try_encode`].
    pub fn encode(&self, values: &[u32]) -> u64 {
        debug_assert!(
            self.check_digits(values).is_ok(),
            "digits {:?} do not fit radices {:?}",
            values,
            self.factors
        );
        values
            .iter()
            .zip(&self.factors)
            .fold(0u64, |acc, (&value, &radix)| {
                acc * u64::from(radix) + u64::from(value)
            })
    }

    pub fn try_encode(&self, values: &[u32]) -> Result<u64, RadixError> {
        self.check_digits(values)?;
        Ok(self.encode(values))
    }

    /// Unpacks an id into its digits, least significant first extraction.
    pub fn decode(&self, id: u64) -> Vec<u32> {
        debug_assert!(id < self.size, "id {} out of range {}", id, self.size);
        let mut values = vec![0; self.factors.len()];
        let mut rest = id;
        for (slot, &radix) in values.iter_mut().zip(&self.factors).rev() {
            let radix = u64::from(radix);
            *slot = (rest % radix) as u32;
            rest /= radix;
        }
        values
    }

    pub fn try_decode(&self, id: u64) -> Result<Vec<u32>, RadixError> {
        if id >= self.size {
            return Err(RadixError::IdOutOfRange {
                id,
                size: self.size,
            });
        }
        Ok(self.decode(id))
    }

    fn check_digits(&self, values: &[u32]) -> Result<(), RadixError> {
        if values.len() != self.factors.len() {
            return Err(RadixError::LengthMismatch {
                expected: self.factors.len(),
                actual: values.len(),
            });
        }
        for (index, (&value, &radix)) in values.iter().zip(&self.factors).enumerate() {
            if value >= radix {
                return Err(RadixError::DigitOutOfRange {
                    index,
                    value,
                    radix,
                });
            }
        }
        Ok(())
    }
}
