//! uno-zk operator cli
//!
//! authoring tool for the canonical card uid table plus offline helpers for
//! committing decks and building circuit inputs from a game snapshot.
//!
//! ## Usage
//!
//! ```bash
//! # print the canonical uid table
//! uno-zk uid-table
//!
//! # commit a shuffled deck, write the snapshot
//! uno-zk init --game-id 42 --shuffle --out game.json
//!
//! # consume a card and print the draw circuit input
//! uno-zk draw --snapshot game.json --card 7R --position 3 --write
//!
//! # prove and verify against the configured verifier
//! uno-zk prove --circuit draw --input draw.json --out proof.json
//! uno-zk verify --proof proof.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::OsRng;
use serde_json::Value;
use tracing::{info, warn};

use uno_zk::aggregation::AggregationClient;
use uno_zk::cards::{canonical_enumeration, card_index, compute_card_uid, shuffled_deck, standard_deck_codes};
use uno_zk::field::{field_to_b256, field_to_decimal, field_to_hex, id_to_field};
use uno_zk::inputs::{deal_input, draw_input, shuffle_input_for};
use uno_zk::verifier::{wallet_from_key, RecordOutcome};
use uno_zk::{
    Card, CircuitKind, Config, GameSnapshot, GameZkState, HttpProvingBackend, ProofClient,
    ProofData, VerifierClient, VerifyOutcome,
};

#[derive(Parser)]
#[command(name = "uno-zk")]
#[command(about = "zk uno card identities, deck commitments and circuit inputs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// toml config file
    #[arg(short, long, env = "UNO_ZK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Hex,
    Decimal,
}

#[derive(Clone, Copy, ValueEnum)]
enum Circuit {
    Shuffle,
    Deal,
    Draw,
    Play,
}

impl From<Circuit> for CircuitKind {
    fn from(c: Circuit) -> Self {
        match c {
            Circuit::Shuffle => CircuitKind::Shuffle,
            Circuit::Deal => CircuitKind::Deal,
            Circuit::Draw => CircuitKind::Draw,
            Circuit::Play => CircuitKind::Play,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// print the 108 canonical card uids in table order
    UidTable {
        #[arg(short, long, value_enum, default_value = "hex")]
        encoding: Encoding,
    },

    /// show the identity and uid of every copy of a card code
    Card {
        /// symbolic code, e.g. 0R, skipG, D2B, W4
        code: String,
    },

    /// commit a deck for a game and write its snapshot
    Init {
        #[arg(short, long)]
        game_id: String,

        /// comma separated card codes in deck order
        #[arg(short, long, value_delimiter = ',', conflicts_with = "shuffle")]
        deck: Vec<String>,

        /// use a freshly shuffled standard deck
        #[arg(long)]
        shuffle: bool,

        #[arg(short, long, default_value = "game.json")]
        out: PathBuf,
    },

    /// consume a card and print the draw circuit input
    Draw {
        #[arg(short, long)]
        snapshot: PathBuf,

        #[arg(long)]
        card: String,

        #[arg(short, long)]
        position: usize,

        /// write the updated snapshot back
        #[arg(long)]
        write: bool,
    },

    /// print the deal circuit input for a player's positions
    Deal {
        #[arg(short, long)]
        snapshot: PathBuf,

        #[arg(long)]
        player: String,

        #[arg(long, value_delimiter = ',', required = true)]
        positions: Vec<usize>,
    },

    /// print the shuffle circuit input (canonical table to deck order)
    Shuffle {
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// send a circuit input to the prover service
    Prove {
        #[arg(long, value_enum)]
        circuit: Circuit,

        /// circuit input json
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// submit a proof for aggregation and wait for its receipt
    Aggregate {
        #[arg(long, value_enum)]
        circuit: Circuit,

        #[arg(short, long)]
        proof: PathBuf,
    },

    /// verify a proof against the configured verifier contract
    Verify {
        #[arg(short, long)]
        proof: PathBuf,

        /// record the verification on-chain for this game
        #[arg(long)]
        record: Option<String>,

        /// rpc the signer starts on, switched to the verifier rpc when on another chain
        #[arg(long, env = "UNO_ZK_SIGNER_RPC")]
        signer_rpc: Option<String>,

        #[arg(long, env = "UNO_ZK_PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn read_snapshot(path: &Path) -> Result<GameSnapshot> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_proof(path: &Path) -> Result<ProofData> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing proof {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "uno_zk=info",
        1 => "uno_zk=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::UidTable { encoding } => {
            for (index, (color, card_type, copy)) in canonical_enumeration().into_iter().enumerate() {
                let uid = compute_card_uid(color, card_type, copy);
                let rendered = match encoding {
                    Encoding::Hex => format!("0x{}", field_to_hex(&uid)),
                    Encoding::Decimal => field_to_decimal(&uid),
                };
                println!("{:3} {} {:2} {} {}", index, color, card_type, copy, rendered);
            }
        }

        Commands::Card { code } => {
            let card = Card::parse(&code)?;
            println!("{} color {} type {}", card, card.color as u8, card.card_type);
            for copy in 0..card.copies() {
                let index = card_index(card.color as u8, card.card_type, copy)?;
                let uid = compute_card_uid(card.color as u8, card.card_type, copy);
                println!("  copy {} slot {:3} uid 0x{}", copy, index, field_to_hex(&uid));
            }
        }

        Commands::Init {
            game_id,
            deck,
            shuffle,
            out,
        } => {
            let codes = if shuffle {
                shuffled_deck(&mut OsRng)
            } else if deck.is_empty() {
                standard_deck_codes()
            } else {
                deck
            };

            let mut state = GameZkState::new(game_id, config.game);
            let root = state.initialize_deck(&codes, &mut OsRng)?;
            write_json(&out, &state.snapshot())?;

            info!("wrote {}", out.display());
            println!("root 0x{}", field_to_hex(&root));
        }

        Commands::Draw {
            snapshot,
            card,
            position,
            write,
        } => {
            let mut state = GameZkState::restore(&read_snapshot(&snapshot)?, config.game)?;
            let Some(consumed) = state.consume_card(&card, position)? else {
                bail!("no unconsumed {} in game {}", card, state.game_id());
            };
            if consumed.transition.repeated {
                warn!("position {} was already consumed", consumed.card.deck_index);
            }

            print_json(&draw_input(&consumed))?;
            if write {
                write_json(&snapshot, &state.snapshot())?;
                info!("updated {}", snapshot.display());
            }
        }

        Commands::Deal {
            snapshot,
            player,
            positions,
        } => {
            let state = GameZkState::restore(&read_snapshot(&snapshot)?, config.game)?;
            print_json(&deal_input(&state, &player, &positions)?)?;
        }

        Commands::Shuffle { snapshot } => {
            let state = GameZkState::restore(&read_snapshot(&snapshot)?, config.game)?;
            print_json(&shuffle_input_for(&state)?)?;
        }

        Commands::Prove {
            circuit,
            input,
            out,
        } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let inputs: Value = serde_json::from_str(&content)?;

            let client = ProofClient::new(HttpProvingBackend::new(&config.prover)?);
            let proof = client.prove(circuit.into(), inputs).await?;

            match out {
                Some(path) => {
                    write_json(&path, &proof)?;
                    info!("wrote {}", path.display());
                }
                None => print_json(&proof)?,
            }
        }

        Commands::Aggregate { circuit, proof } => {
            let proof = read_proof(&proof)?;
            let client = AggregationClient::new(&config.aggregation);
            let receipt = client.submit_and_wait(circuit.into(), &proof).await?;
            print_json(&receipt)?;
        }

        Commands::Verify {
            proof,
            record,
            signer_rpc,
            private_key,
        } => {
            let proof = read_proof(&proof)?;
            let verifier = VerifierClient::new(&config.verifier)?;

            let Some(game_id) = record else {
                match verifier.verify(&proof).await? {
                    VerifyOutcome::Valid => println!("valid"),
                    VerifyOutcome::Invalid => println!("invalid"),
                    VerifyOutcome::Reverted(reason) => println!("reverted: {}", reason),
                }
                return Ok(());
            };

            let Some(private_key) = private_key else {
                bail!("--record needs a signer key (UNO_ZK_PRIVATE_KEY)");
            };
            let wallet = wallet_from_key(&private_key)?;
            let tag = field_to_b256(&id_to_field(&game_id));

            match verifier
                .verify_and_record(wallet, signer_rpc.as_deref(), &proof, tag)
                .await?
            {
                RecordOutcome::Recorded(receipt) => println!(
                    "recorded in {} (block {}, success {})",
                    receipt.tx_hash, receipt.block_number, receipt.success
                ),
                RecordOutcome::Reverted(reason) => println!("reverted: {}", reason),
            }
        }
    }

    Ok(())
}
