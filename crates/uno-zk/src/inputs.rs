//! circuit input builders
//!
//! each builder maps game state onto the exact field names one external
//! circuit reads. every field value is a base-10 string, deck-wide arrays
//! are padded to DECK_SIZE and merkle paths to TREE_DEPTH.

use serde::Serialize;

use crate::bitset::Bits;
use crate::cards::card_uid_table;
use crate::commitment::{card_commitment, move_commitment};
use crate::constants::{DECK_SIZE, TREE_DEPTH};
use crate::error::{Error, Result};
use crate::field::{field_to_decimal, id_to_field, Fr, Zero};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::state::{CardInstance, ConsumeResult, GameZkState};

fn decimal(value: &Fr) -> String {
    field_to_decimal(value)
}

/// decimal strings for `values`, zero padded to `width`
fn pad_decimal(values: &[Fr], width: usize) -> Vec<String> {
    let mut padded = values.to_vec();
    padded.resize(width, Fr::zero());
    padded.iter().map(decimal).collect()
}

fn bits_to_u8(bits: &Bits) -> Vec<u8> {
    bits.iter().map(|b| *b as u8).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerklePathInput {
    pub path: Vec<String>,
    pub indices: Vec<u8>,
}

impl From<&MerkleProof> for MerklePathInput {
    fn from(proof: &MerkleProof) -> Self {
        Self {
            path: pad_decimal(&proof.path, TREE_DEPTH),
            indices: proof.indices.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShuffleInput {
    pub uids_in: Vec<String>,
    pub uids_out: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DealInput {
    pub player_id: String,
    pub merkle_root: String,
    pub positions: Vec<String>,
    pub card_uids: Vec<String>,
    pub nonces: Vec<String>,
    pub merkle_paths: Vec<MerklePathInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrawInput {
    pub merkle_root: String,
    pub old_consumed_hash: String,
    pub new_consumed_hash: String,
    pub old_consumed_count: String,
    pub new_consumed_count: String,
    pub position: String,
    pub card_uid: String,
    pub nonce: String,
    pub merkle_path: MerklePathInput,
    pub old_consumed_bits: Vec<u8>,
    pub new_consumed_bits: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayInput {
    pub game_id: String,
    pub player_id: String,
    pub move_commitment: String,
    pub hand_merkle_root: String,
    pub top_card_commitment: String,
    pub played_card_color: String,
    pub played_card_type: String,
    pub played_card_copy: String,
    pub played_card_nonce: String,
    pub played_card_merkle_path: MerklePathInput,
    pub top_card_color: String,
    pub top_card_type: String,
    pub top_card_copy: String,
    pub top_card_nonce: String,
    pub commitment_nonce: String,
}

macro_rules! impl_to_json {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                /// json body for the prover service
                pub fn to_json(&self) -> Result<serde_json::Value> {
                    Ok(serde_json::to_value(self)?)
                }
            }
        )*
    };
}

impl_to_json!(ShuffleInput, DealInput, DrawInput, PlayInput);

/// shuffle relation between two uid sequences
pub fn shuffle_input(uids_in: &[Fr], uids_out: &[Fr]) -> Result<ShuffleInput> {
    for (name, uids) in [("uids_in", uids_in), ("uids_out", uids_out)] {
        if uids.len() > DECK_SIZE {
            return Err(Error::InvalidInput(format!(
                "{} has {} entries, at most {}",
                name,
                uids.len(),
                DECK_SIZE
            )));
        }
    }
    Ok(ShuffleInput {
        uids_in: pad_decimal(uids_in, DECK_SIZE),
        uids_out: pad_decimal(uids_out, DECK_SIZE),
    })
}

/// canonical table in, the game's deck order out
pub fn shuffle_input_for(state: &GameZkState) -> Result<ShuffleInput> {
    shuffle_input(card_uid_table(), &state.deck_uids())
}

/// dealt cards are genuine leaves of the committed deck
pub fn deal_input(state: &GameZkState, player_id: &str, positions: &[usize]) -> Result<DealInput> {
    let cards = state.hand(positions)?;
    let paths = positions
        .iter()
        .map(|&p| state.merkle_proof(p).map(|proof| MerklePathInput::from(&proof)))
        .collect::<Result<Vec<_>>>()?;

    Ok(DealInput {
        player_id: decimal(&id_to_field(player_id)),
        merkle_root: decimal(&state.root()),
        positions: positions.iter().map(|p| p.to_string()).collect(),
        card_uids: cards.iter().map(|c| decimal(&c.uid)).collect(),
        nonces: cards.iter().map(|c| decimal(&c.nonce)).collect(),
        merkle_paths: paths,
    })
}

/// single-card draw: leaf membership plus the bitset transition
pub fn draw_input(consumed: &ConsumeResult) -> DrawInput {
    let t = &consumed.transition;
    DrawInput {
        merkle_root: decimal(&consumed.merkle_root),
        old_consumed_hash: decimal(&t.old_hash),
        new_consumed_hash: decimal(&t.new_hash),
        old_consumed_count: t.old_count.to_string(),
        new_consumed_count: t.new_count.to_string(),
        position: consumed.card.deck_index.to_string(),
        card_uid: decimal(&consumed.card.uid),
        nonce: decimal(&consumed.card.nonce),
        merkle_path: MerklePathInput::from(&consumed.merkle_proof),
        old_consumed_bits: bits_to_u8(&t.old_bits),
        new_consumed_bits: bits_to_u8(&t.new_bits),
    }
}

/// everything a play proof reads, built from the player's private hand
pub struct PlayRequest<'a> {
    pub game_id: &'a str,
    pub player_id: &'a str,
    pub hand: &'a [CardInstance],
    /// index of the played card within `hand`
    pub played: usize,
    pub top_card: &'a CardInstance,
    pub commitment_nonce: Fr,
}

/// legal play from a committed hand, rest of the hand stays private
pub fn play_input(request: &PlayRequest<'_>) -> Result<PlayInput> {
    let played = request.hand.get(request.played).ok_or(Error::PositionOutOfRange {
        position: request.played,
        len: request.hand.len(),
    })?;

    let commitments: Vec<Fr> = request.hand.iter().map(|c| c.commitment).collect();
    let hand_tree = MerkleTree::build(&commitments)?;
    let path = hand_tree.prove(request.played)?;

    let game_id = id_to_field(request.game_id);
    let player_id = id_to_field(request.player_id);
    let top = request.top_card;

    Ok(PlayInput {
        game_id: decimal(&game_id),
        player_id: decimal(&player_id),
        move_commitment: decimal(&move_commitment(
            game_id,
            player_id,
            played.uid,
            request.commitment_nonce,
        )),
        hand_merkle_root: decimal(&hand_tree.root),
        top_card_commitment: decimal(&card_commitment(top.uid, top.nonce)),
        played_card_color: (played.card.color as u8).to_string(),
        played_card_type: played.card.card_type.to_string(),
        played_card_copy: played.copy_index.to_string(),
        played_card_nonce: decimal(&played.nonce),
        played_card_merkle_path: MerklePathInput::from(&path),
        top_card_color: (top.card.color as u8).to_string(),
        top_card_type: top.card.card_type.to_string(),
        top_card_copy: top.copy_index.to_string(),
        top_card_nonce: decimal(&top.nonce),
        commitment_nonce: decimal(&request.commitment_nonce),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::merkle::hand_root;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn game() -> GameZkState {
        let mut state = GameZkState::new("g1", GameConfig::default());
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        state
            .initialize_deck(&["0R", "skipG", "D2B", "W", "7Y"], &mut rng)
            .unwrap();
        state
    }

    #[test]
    fn test_draw_fixed_lengths() {
        let mut state = game();
        let consumed = state.consume_card("skipG", 1).unwrap().unwrap();
        let input = draw_input(&consumed);

        assert_eq!(input.old_consumed_bits.len(), DECK_SIZE);
        assert_eq!(input.new_consumed_bits.len(), DECK_SIZE);
        assert_eq!(input.merkle_path.path.len(), TREE_DEPTH);
        assert_eq!(input.merkle_path.indices.len(), TREE_DEPTH);
        assert_eq!(input.old_consumed_bits[1], 0);
        assert_eq!(input.new_consumed_bits[1], 1);
        assert_eq!(input.old_consumed_count, "0");
        assert_eq!(input.new_consumed_count, "1");
        assert_eq!(input.position, "1");
        assert_eq!(input.merkle_root, field_to_decimal(&state.root()));
    }

    #[test]
    fn test_draw_json_field_names() {
        let mut state = game();
        let consumed = state.consume_card("0R", 0).unwrap().unwrap();
        let json = draw_input(&consumed).to_json().unwrap();
        for key in [
            "merkle_root",
            "old_consumed_hash",
            "new_consumed_hash",
            "old_consumed_count",
            "new_consumed_count",
            "position",
            "card_uid",
            "nonce",
            "merkle_path",
            "old_consumed_bits",
            "new_consumed_bits",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        // decimal, never hex
        let uid = json["card_uid"].as_str().unwrap();
        assert!(uid.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_shuffle_padding() {
        let state = game();
        let input = shuffle_input_for(&state).unwrap();
        assert_eq!(input.uids_in.len(), DECK_SIZE);
        assert_eq!(input.uids_out.len(), DECK_SIZE);
        assert_eq!(input.uids_out[5], "0");
        assert_eq!(input.uids_out[0], field_to_decimal(&state.card_at(0).unwrap().uid));

        let too_many = vec![Fr::from(1u64); DECK_SIZE + 1];
        assert!(matches!(
            shuffle_input(&too_many, &[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deal_one_entry_per_position() {
        let state = game();
        let input = deal_input(&state, "alice", &[0, 3]).unwrap();
        assert_eq!(input.positions, vec!["0", "3"]);
        assert_eq!(input.card_uids.len(), 2);
        assert_eq!(input.nonces.len(), 2);
        assert_eq!(input.merkle_paths.len(), 2);
        assert!(input.merkle_paths.iter().all(|p| p.path.len() == TREE_DEPTH));
        assert_eq!(input.player_id, field_to_decimal(&id_to_field("alice")));

        assert!(matches!(
            deal_input(&state, "alice", &[9]),
            Err(Error::PositionOutOfRange { position: 9, .. })
        ));
    }

    #[test]
    fn test_play_binds_hand_and_move() {
        let state = game();
        let hand = state.hand(&[0, 2, 4]).unwrap();
        let top = state.card_at(1).unwrap().clone();
        let nonce = Fr::from(1234u64);

        let input = play_input(&PlayRequest {
            game_id: "g1",
            player_id: "7",
            hand: &hand,
            played: 1,
            top_card: &top,
            commitment_nonce: nonce,
        })
        .unwrap();

        let commitments: Vec<Fr> = hand.iter().map(|c| c.commitment).collect();
        assert_eq!(input.hand_merkle_root, field_to_decimal(&hand_root(&commitments).unwrap()));
        assert_eq!(input.top_card_commitment, field_to_decimal(&top.commitment));
        assert_eq!(input.played_card_type, "12");
        assert_eq!(input.played_card_color, "3");
        assert_eq!(input.top_card_type, "10");
        assert_eq!(input.player_id, "7");
        assert_eq!(input.played_card_merkle_path.indices[0], 1);

        let expected = move_commitment(id_to_field("g1"), Fr::from(7u64), hand[1].uid, nonce);
        assert_eq!(input.move_commitment, field_to_decimal(&expected));
    }

    #[test]
    fn test_play_index_out_of_hand() {
        let state = game();
        let hand = state.hand(&[0]).unwrap();
        let top = state.card_at(1).unwrap().clone();
        let result = play_input(&PlayRequest {
            game_id: "g1",
            player_id: "p",
            hand: &hand,
            played: 1,
            top_card: &top,
            commitment_nonce: Fr::from(1u64),
        });
        assert!(result.is_err());
    }
}
