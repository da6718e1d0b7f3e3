//! circom-compatible poseidon over bn254
//!
//! arity equals input count, matching circomlib `Poseidon(n)`.

use light_poseidon::{Poseidon, PoseidonHasher};

use crate::field::Fr;

fn poseidon<const N: usize>(inputs: [Fr; N]) -> Fr {
    // circom parameters exist for 1..=12 inputs, N is fixed at each call site
    let mut hasher = Poseidon::<Fr>::new_circom(N).expect("poseidon arity within circom range");
    hasher
        .hash(&inputs)
        .expect("poseidon input count matches arity")
}

/// H2(a, b)
pub fn hash2(a: Fr, b: Fr) -> Fr {
    poseidon([a, b])
}

/// H3(a, b, c)
pub fn hash3(a: Fr, b: Fr, c: Fr) -> Fr {
    poseidon([a, b, c])
}

/// H4(a, b, c, d)
pub fn hash4(a: Fr, b: Fr, c: Fr, d: Fr) -> Fr {
    poseidon([a, b, c, d])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{field_to_decimal, Zero};

    #[test]
    fn test_circomlib_vector() {
        // circomlibjs poseidon([1, 2])
        let h = hash2(Fr::from(1u64), Fr::from(2u64));
        assert_eq!(
            field_to_decimal(&h),
            "7853200120776062878684798364095072458815029376092732009249414926327459813530"
        );
    }

    #[test]
    fn test_hash2_order_matters() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_ne!(hash2(a, b), hash2(b, a));
    }

    #[test]
    fn test_arity_separates() {
        let z = Fr::zero();
        assert_ne!(hash2(z, z), hash3(z, z, z));
        assert_ne!(hash3(z, z, z), hash4(z, z, z, z));
    }

    #[test]
    fn test_deterministic() {
        let a = Fr::from(11u64);
        let b = Fr::from(22u64);
        let c = Fr::from(33u64);
        let d = Fr::from(44u64);
        assert_eq!(hash4(a, b, c, d), hash4(a, b, c, d));
        assert_eq!(hash3(a, b, c), hash3(a, b, c));
    }
}
