//! card commitments and merkle node hashing

use crate::constants::DOMAIN_CARD_COMMITMENT;
use crate::field::Fr;
use crate::poseidon::{hash2, hash3, hash4};

/// hiding commitment to a card: H3(DOMAIN_CARD_COMMITMENT, uid, nonce)
pub fn card_commitment(uid: Fr, nonce: Fr) -> Fr {
    hash3(Fr::from(DOMAIN_CARD_COMMITMENT), uid, nonce)
}

/// merkle parent: H2(left, right)
///
/// carries no domain tag so roots stay compatible with the generic
/// poseidon incremental merkle tree used on-chain.
pub fn parent_hash(left: Fr, right: Fr) -> Fr {
    hash2(left, right)
}

/// binds a play to (game, player, card): H4(game_id, player_id, uid, nonce)
pub fn move_commitment(game_id: Fr, player_id: Fr, uid: Fr, nonce: Fr) -> Fr {
    hash4(game_id, player_id, uid, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::get_card_uid;
    use crate::field::{field_to_decimal, Zero};

    #[test]
    fn test_commitment_vectors() {
        let uid = get_card_uid(1, 0, 0).unwrap();
        assert_eq!(
            field_to_decimal(&card_commitment(uid, Fr::from(7u64))),
            "5934195203051435872402989068000826542220574931344971746419536893107449797749"
        );

        let uid = get_card_uid(2, 7, 1).unwrap();
        let played = move_commitment(Fr::from(1u64), Fr::from(100u64), uid, Fr::from(77u64));
        assert_eq!(
            field_to_decimal(&played),
            "914559021756453506034620011050661049220826255577867691930317555875247002136"
        );
    }

    #[test]
    fn test_commitment_hides_with_nonce() {
        let uid = get_card_uid(1, 0, 0).unwrap();
        let c1 = card_commitment(uid, Fr::from(1u64));
        let c2 = card_commitment(uid, Fr::from(2u64));
        assert_ne!(c1, c2);
        assert_eq!(c1, card_commitment(uid, Fr::from(1u64)));
        assert_ne!(c1, Fr::zero());
    }

    #[test]
    fn test_parent_hash_is_untagged_poseidon() {
        let l = Fr::from(5u64);
        let r = Fr::from(6u64);
        assert_eq!(parent_hash(l, r), hash2(l, r));
        assert_ne!(parent_hash(l, r), parent_hash(r, l));
    }

    #[test]
    fn test_commitment_domain_separated() {
        // same inputs through an untagged H3 must not collide
        let uid = Fr::from(9u64);
        let nonce = Fr::from(10u64);
        assert_ne!(card_commitment(uid, nonce), hash3(Fr::zero(), uid, nonce));
    }

    #[test]
    fn test_move_commitment_binds_player() {
        let uid = get_card_uid(2, 7, 1).unwrap();
        let nonce = Fr::from(77u64);
        let game = Fr::from(1u64);
        let a = move_commitment(game, Fr::from(100u64), uid, nonce);
        let b = move_commitment(game, Fr::from(101u64), uid, nonce);
        assert_ne!(a, b);
    }
}
