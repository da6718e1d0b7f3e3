//! per-game zk state
//!
//! one [`GameZkState`] owns a shuffled deck, the per-card commitments, the
//! commitment tree over them and the consumed bitset. lifecycle:
//!
//! ```text
//! new() ──► initialize_deck() ──► consume_card()* ──► snapshot()/drop
//!   ▲                                   │
//!   └──────────── restore() ◄───────────┘
//! ```
//!
//! callers serialise mutations per game, see [`crate::store::GameStore`].

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bitset::{BitsetTransition, Bits, ConsumedBitset};
use crate::cards::{get_card_uid, Card, Color};
use crate::commitment::card_commitment;
use crate::config::GameConfig;
use crate::constants::DECK_SIZE;
use crate::error::{Error, Result};
use crate::field::{field_to_hex, parse_hex_field, random_field, Fr};
use crate::merkle::{MerkleProof, MerkleTree};

/// lookup key for one dealt slot
pub fn card_key(code: &str, deck_index: usize) -> String {
    format!("{}:{}", code, deck_index)
}

/// one physical card inside one game
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardInstance {
    pub code: String,
    pub uid: Fr,
    pub nonce: Fr,
    pub commitment: Fr,
    pub deck_index: usize,
    pub card: Card,
    pub copy_index: u8,
    pub consumed: bool,
}

impl CardInstance {
    pub fn key(&self) -> String {
        card_key(&self.code, self.deck_index)
    }
}

/// copy index per card in deck order: the n-th occurrence of a kind gets n
pub fn assign_copy_indices(cards: &[Card]) -> Vec<u8> {
    cards
        .iter()
        .scan(HashMap::<Card, u8>::new(), |seen, card| {
            let next = seen.entry(*card).or_insert(0);
            let copy = *next;
            *next = next.saturating_add(1);
            Some(copy)
        })
        .collect()
}

/// everything a draw/play proof needs about one consumption
#[derive(Clone, Debug)]
pub struct ConsumeResult {
    pub card: CardInstance,
    pub merkle_root: Fr,
    pub merkle_proof: MerkleProof,
    pub transition: BitsetTransition,
}

#[derive(Clone, Debug)]
pub struct GameZkState {
    game_id: String,
    deck: Vec<String>,
    cards: BTreeMap<String, CardInstance>,
    tree: MerkleTree,
    consumed: ConsumedBitset,
    config: GameConfig,
}

impl GameZkState {
    /// state with no deck loaded, root zero
    pub fn new(game_id: impl Into<String>, config: GameConfig) -> Self {
        Self {
            game_id: game_id.into(),
            deck: Vec::new(),
            cards: BTreeMap::new(),
            tree: MerkleTree::empty(),
            consumed: ConsumedBitset::new(),
            config,
        }
    }

    /// load a shuffled deck, replacing any previous state for this game
    ///
    /// nonces are drawn fresh for every instance. returns the new root.
    pub fn initialize_deck<S, R>(&mut self, codes: &[S], rng: &mut R) -> Result<Fr>
    where
        S: AsRef<str>,
        R: RngCore + CryptoRng,
    {
        if codes.len() > DECK_SIZE {
            return Err(Error::InvalidInput(format!(
                "deck has {} cards, at most {} allowed",
                codes.len(),
                DECK_SIZE
            )));
        }

        let parsed = codes
            .iter()
            .map(|code| Card::parse(code.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let copies = assign_copy_indices(&parsed);

        let mut cards = BTreeMap::new();
        let mut leaves = Vec::with_capacity(parsed.len());
        for (deck_index, ((code, card), copy_index)) in
            codes.iter().zip(&parsed).zip(copies).enumerate()
        {
            let uid = get_card_uid(card.color as u8, card.card_type, copy_index)?;
            let nonce = random_field(rng);
            let commitment = card_commitment(uid, nonce);
            let instance = CardInstance {
                code: code.as_ref().to_string(),
                uid,
                nonce,
                commitment,
                deck_index,
                card: *card,
                copy_index,
                consumed: false,
            };
            leaves.push(commitment);
            cards.insert(instance.key(), instance);
        }

        let tree = MerkleTree::build(&leaves)?;

        self.deck = codes.iter().map(|c| c.as_ref().to_string()).collect();
        self.cards = cards;
        self.tree = tree;
        self.consumed = ConsumedBitset::new();

        info!(
            "game {}: loaded {} card deck, root {}",
            self.game_id,
            self.deck.len(),
            field_to_hex(&self.tree.root)
        );
        Ok(self.tree.root)
    }

    /// mark a card as having left the deck
    ///
    /// looks up `(code, position)` first, then the first unconsumed card with
    /// the same code. `None` when nothing matches.
    pub fn consume_card(&mut self, code: &str, position: usize) -> Result<Option<ConsumeResult>> {
        let key = match self.find_instance_key(code, position) {
            Some(key) => key,
            None => {
                debug!("game {}: no card {} to consume", self.game_id, code);
                return Ok(None);
            }
        };

        let deck_index = match self.cards.get(&key) {
            Some(instance) => instance.deck_index,
            None => return Ok(None),
        };

        let transition = self
            .consumed
            .consume(deck_index, self.config.reject_double_consume)?;
        let merkle_proof = self.tree.prove(deck_index)?;

        let card = match self.cards.get_mut(&key) {
            Some(instance) => {
                instance.consumed = true;
                instance.clone()
            }
            None => return Ok(None),
        };

        Ok(Some(ConsumeResult {
            card,
            merkle_root: self.tree.root,
            merkle_proof,
            transition,
        }))
    }

    fn find_instance_key(&self, code: &str, position: usize) -> Option<String> {
        let exact = card_key(code, position);
        if self.cards.contains_key(&exact) {
            return Some(exact);
        }
        self.deck
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == code)
            .map(|(i, c)| card_key(c, i))
            .find(|key| self.cards.get(key).is_some_and(|card| !card.consumed))
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn deck(&self) -> &[String] {
        &self.deck
    }

    pub fn root(&self) -> Fr {
        self.tree.root
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn consumed(&self) -> &ConsumedBitset {
        &self.consumed
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card_at(&self, position: usize) -> Option<&CardInstance> {
        let code = self.deck.get(position)?;
        self.cards.get(&card_key(code, position))
    }

    /// card instances in deck order
    pub fn cards(&self) -> impl Iterator<Item = &CardInstance> + '_ {
        (0..self.deck.len()).filter_map(move |i| self.card_at(i))
    }

    /// uids in deck order
    pub fn deck_uids(&self) -> Vec<Fr> {
        self.cards().map(|c| c.uid).collect()
    }

    pub fn merkle_proof(&self, position: usize) -> Result<MerkleProof> {
        if position >= self.deck.len() {
            return Err(Error::PositionOutOfRange {
                position,
                len: self.deck.len(),
            });
        }
        self.tree.prove(position)
    }

    /// card instances at the given deck positions
    pub fn hand(&self, positions: &[usize]) -> Result<Vec<CardInstance>> {
        positions
            .iter()
            .map(|&position| {
                self.card_at(position).cloned().ok_or(Error::PositionOutOfRange {
                    position,
                    len: self.deck.len(),
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id.clone(),
            deck: self.deck.clone(),
            cards: self
                .cards()
                .map(|c| SnapshotCard {
                    key: c.key(),
                    card_str: c.code.clone(),
                    uid: field_to_hex(&c.uid),
                    nonce: field_to_hex(&c.nonce),
                    commitment: field_to_hex(&c.commitment),
                    deck_index: c.deck_index,
                    color: c.card.color as u8,
                    card_type: c.card.card_type,
                    copy_index: c.copy_index,
                    consumed: c.consumed,
                })
                .collect(),
            consumed_bits: self.consumed.bits().to_vec(),
            consumed_count: self.consumed.count(),
        }
    }

    /// rehydrate from a snapshot, rebuilding the tree from stored commitments
    ///
    /// every commitment is re-derived from its uid and nonce, a snapshot
    /// that does not reproduce is rejected.
    pub fn restore(snapshot: &GameSnapshot, config: GameConfig) -> Result<Self> {
        let bits: Bits = snapshot.consumed_bits.as_slice().try_into().map_err(|_| {
            Error::SnapshotMismatch(format!(
                "consumed bits has {} entries, expected {}",
                snapshot.consumed_bits.len(),
                DECK_SIZE
            ))
        })?;

        if snapshot.cards.len() != snapshot.deck.len() {
            return Err(Error::SnapshotMismatch(format!(
                "{} cards for a {} card deck",
                snapshot.cards.len(),
                snapshot.deck.len()
            )));
        }
        if snapshot.deck.len() > DECK_SIZE {
            return Err(Error::SnapshotMismatch(format!(
                "deck of {} cards",
                snapshot.deck.len()
            )));
        }

        if let Some(stray) = bits[snapshot.deck.len()..].iter().position(|b| *b) {
            return Err(Error::SnapshotMismatch(format!(
                "bit {} set past the end of a {} card deck",
                snapshot.deck.len() + stray,
                snapshot.deck.len()
            )));
        }
        let set_bits = bits.iter().filter(|b| **b).count();
        if (snapshot.consumed_count as usize) < set_bits {
            return Err(Error::SnapshotMismatch(format!(
                "consumed count {} below {} set bits",
                snapshot.consumed_count, set_bits
            )));
        }

        let mut cards = BTreeMap::new();
        let mut uids = HashSet::with_capacity(snapshot.cards.len());
        let mut leaves = vec![None; snapshot.deck.len()];
        for entry in &snapshot.cards {
            let instance = entry.to_instance()?;
            if !uids.insert(instance.uid) {
                return Err(Error::SnapshotMismatch(format!(
                    "card {} repeats copy {} of {}",
                    instance.key(),
                    instance.copy_index,
                    instance.code
                )));
            }
            let slot = leaves.get_mut(instance.deck_index).ok_or_else(|| {
                Error::SnapshotMismatch(format!("deck index {} out of range", instance.deck_index))
            })?;
            if slot.is_some() {
                return Err(Error::SnapshotMismatch(format!(
                    "deck index {} appears twice",
                    instance.deck_index
                )));
            }
            if snapshot.deck[instance.deck_index] != instance.code {
                return Err(Error::SnapshotMismatch(format!(
                    "deck index {} holds {}, card says {}",
                    instance.deck_index, snapshot.deck[instance.deck_index], instance.code
                )));
            }
            if bits[instance.deck_index] != instance.consumed {
                return Err(Error::SnapshotMismatch(format!(
                    "card {} consumed flag disagrees with bitset",
                    instance.key()
                )));
            }
            *slot = Some(instance.commitment);
            cards.insert(instance.key(), instance);
        }

        // every slot is filled: same count, no duplicates
        let leaves: Vec<Fr> = leaves.into_iter().flatten().collect();
        let tree = MerkleTree::build(&leaves)?;

        info!(
            "game {}: restored {} cards, {} consumed",
            snapshot.game_id,
            cards.len(),
            snapshot.consumed_count
        );

        Ok(Self {
            game_id: snapshot.game_id.clone(),
            deck: snapshot.deck.clone(),
            cards,
            tree,
            consumed: ConsumedBitset::from_parts(bits, snapshot.consumed_count),
            config,
        })
    }
}

/// persisted shape of a game, field values as hex
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: String,
    pub deck: Vec<String>,
    pub cards: Vec<SnapshotCard>,
    pub consumed_bits: Vec<bool>,
    pub consumed_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCard {
    pub key: String,
    pub card_str: String,
    pub uid: String,
    pub nonce: String,
    pub commitment: String,
    pub deck_index: usize,
    pub color: u8,
    #[serde(rename = "type")]
    pub card_type: u8,
    pub copy_index: u8,
    pub consumed: bool,
}

impl SnapshotCard {
    fn to_instance(&self) -> Result<CardInstance> {
        let mismatch = |what: &str| {
            Error::SnapshotMismatch(format!("card {}: {}", self.key, what))
        };

        let color = Color::from_u8(self.color).ok_or_else(|| mismatch("unknown color"))?;
        let card = Card::new(color, self.card_type);
        if Card::parse(&self.card_str)? != card {
            return Err(mismatch("code does not match color/type"));
        }

        let uid = parse_hex_field(&self.uid)?;
        let nonce = parse_hex_field(&self.nonce)?;
        let commitment = parse_hex_field(&self.commitment)?;

        if get_card_uid(self.color, self.card_type, self.copy_index)? != uid {
            return Err(mismatch("uid does not match identity"));
        }
        if card_commitment(uid, nonce) != commitment {
            return Err(mismatch("commitment does not open"));
        }

        let instance = CardInstance {
            code: self.card_str.clone(),
            uid,
            nonce,
            commitment,
            deck_index: self.deck_index,
            card,
            copy_index: self.copy_index,
            consumed: self.consumed,
        };
        if instance.key() != self.key {
            return Err(mismatch("key does not match code/index"));
        }
        Ok(instance)
    }
}
