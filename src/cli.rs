use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, RngCore, SeedableRng};

use crate::config::Parameters;
use crate::election::RankingHint;
use crate::fraction::Fraction;
use crate::host::{Address, Amount, InMemoryHost};
use crate::staking::{EpochProcessor, EpochReport, StakingEngine, ValidatorOperations, VoteOperations};
use crate::validators::{
    ValidatorRegistration, BLS_G1_PUBLIC_KEY_LENGTH, BLS_PUBLIC_KEY_LENGTH, ECDSA_PUBLIC_KEY_LENGTH,
};

/// Smallest currency denomination per whole coin.
const COIN: Amount = 1_000_000_000_000_000_000;
const BLOCKS_PER_EPOCH: u64 = 17_280;
const SECONDS_PER_EPOCH: u64 = 24 * 60 * 60;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective parameters as JSON
    Params {
        /// Parameter file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run validators and voters through a number of epochs in memory
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 5)]
        validators: usize,

        #[arg(long, default_value_t = 20)]
        voters: usize,

        #[arg(long, default_value_t = 10)]
        epochs: u64,

        /// Seed for stakes, commissions and uptimes
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Dump the event log as JSON at the end
        #[arg(long)]
        events: bool,
    },
}

#[derive(Clone, Debug)]
pub struct SimulationOptions {
    pub validators: usize,
    pub voters: usize,
    pub epochs: u64,
    pub seed: u64,
}

pub struct Simulation {
    pub engine: StakingEngine<InMemoryHost>,
    pub reports: Vec<EpochReport>,
}

fn load_parameters(config: Option<PathBuf>) -> Result<Parameters> {
    match config {
        Some(path) => Parameters::from_file(path),
        None => Ok(Parameters::default()),
    }
}

fn random_registration(rng: &mut StdRng, account: Address) -> ValidatorRegistration {
    let mut ecdsa = vec![0u8; ECDSA_PUBLIC_KEY_LENGTH];
    let mut bls = vec![0u8; BLS_PUBLIC_KEY_LENGTH];
    let mut bls_g1 = vec![0u8; BLS_G1_PUBLIC_KEY_LENGTH];
    rng.fill_bytes(&mut ecdsa);
    rng.fill_bytes(&mut bls);
    rng.fill_bytes(&mut bls_g1);
    let commission = Fraction::from_raw(Fraction::ONE.raw() / 100 * rng.gen_range(0..=20u128));
    ValidatorRegistration {
        commission,
        ecdsa_public_key: ecdsa,
        bls_pop: InMemoryHost::proof_of_possession_g1(account, &bls, &bls_g1),
        bls_public_key: bls,
        bls_g1_public_key: bls_g1,
    }
}

/// Registers validators, spreads voter stakes over them and processes
/// `options.epochs` epochs with random uptimes between 80% and 100%.
pub fn simulate(parameters: Parameters, options: &SimulationOptions) -> Result<Simulation> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let requirement = parameters.validators.locked_gold_requirements.value;
    let max_backed = parameters.election.max_num_validators_voted_for;

    let mut engine = StakingEngine::new(InMemoryHost::new());
    engine
        .initialize(parameters)
        .context("failed to initialize the staking engine")?;

    let mut validators = Vec::with_capacity(options.validators);
    for i in 0..options.validators {
        let account = Address::from_low_u64(1 + i as u64);
        let signer = Address::from_low_u64(1_000_000 + i as u64);
        engine.host_mut().authorize_signer(account, signer);
        engine.host_mut().lock(account, requirement);
        let registration = random_registration(&mut rng, account);
        engine
            .register_validator(account, registration)
            .with_context(|| format!("failed to register validator {}", account))?;
        validators.push(account);
    }

    if !validators.is_empty() {
        for j in 0..options.voters {
            let voter = Address::from_low_u64(2_000_000 + j as u64);
            let stake = rng.gen_range(1_000..=100_000u128) * COIN;
            engine.host_mut().lock(voter, stake);

            let backed = rng.gen_range(1..=max_backed.min(validators.len()).max(1));
            let per_validator = stake / backed as Amount;
            for index in sample(&mut rng, validators.len(), backed) {
                engine
                    .vote(voter, validators[index], per_validator, RankingHint::default())
                    .with_context(|| format!("failed to cast vote for {}", voter))?;
            }
        }
    }

    let mut reports = Vec::new();
    let mut signers = engine.registry()?.registered_validator_signers();
    for _ in 0..options.epochs {
        let uptimes: Vec<(Address, Fraction)> = signers
            .iter()
            .map(|signer| {
                let uptime = Fraction::new(rng.gen_range(80..=100u128), 100)?;
                Ok((*signer, uptime))
            })
            .collect::<crate::error::Result<_>>()?;

        let report = engine.process_epoch(&uptimes)?;
        match &report.next_validators {
            Some(elected) => {
                info!("Epoch {}: elected {} validators", report.epoch, elected.len());
                signers = elected.clone();
            }
            None => {
                warn!("Epoch {}: election failed, keeping the current set", report.epoch);
            }
        }
        reports.push(report);
        engine.host_mut().advance_epoch(BLOCKS_PER_EPOCH, SECONDS_PER_EPOCH);
    }

    Ok(Simulation { engine, reports })
}

pub struct CliHandler<W: Write> {
    out: W,
}

impl<W: Write> CliHandler<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle_command(&mut self, args: Vec<String>) -> Result<()> {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            // --help and --version
            Err(e) if !e.use_stderr() => {
                write!(self.out, "{}", e)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match cli.command {
            Commands::Params { config } => {
                let parameters = load_parameters(config)?;
                writeln!(self.out, "{}", parameters.to_json()?)?;
                Ok(())
            }

            Commands::Simulate {
                config,
                validators,
                voters,
                epochs,
                seed,
                events,
            } => {
                let parameters = load_parameters(config)?;
                let options = SimulationOptions {
                    validators,
                    voters,
                    epochs,
                    seed,
                };
                let simulation = simulate(parameters, &options)?;

                for report in &simulation.reports {
                    let paid: Amount = report.payments.iter().map(|(_, p)| p.total).sum();
                    let to_voters: Amount = report.voter_rewards.iter().map(|(_, v)| *v).sum();
                    let elected = report
                        .next_validators
                        .as_ref()
                        .map(|set| set.iter().map(ToString::to_string).collect::<Vec<_>>().join(","))
                        .unwrap_or_else(|| "-".to_string());
                    writeln!(
                        self.out,
                        "epoch {}: paid {} to validators, {} to voters, {} activations, elected [{}]",
                        report.epoch, paid, to_voters, report.activations, elected
                    )?;
                }

                let ledger = simulation.engine.ledger()?;
                writeln!(
                    self.out,
                    "total votes {} ({} active, {} pending), minted {}",
                    ledger.total_votes(),
                    ledger.active_votes(),
                    ledger.pending_votes(),
                    simulation.engine.host().total_minted()
                )?;
                if events {
                    writeln!(self.out, "{}", simulation.engine.events().to_json()?)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<String> {
        let mut handler = CliHandler::new(Vec::new());
        let mut argv = vec!["stakeledger".to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        handler.handle_command(argv)?;
        Ok(String::from_utf8(handler.into_inner())?)
    }

    #[test]
    fn test_params_prints_defaults() {
        let output = run(&["params"]).unwrap();
        let parsed: Parameters = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, Parameters::default());
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let options = SimulationOptions {
            validators: 4,
            voters: 12,
            epochs: 4,
            seed: 7,
        };
        let first = simulate(Parameters::default(), &options).unwrap();
        let second = simulate(Parameters::default(), &options).unwrap();
        assert_eq!(first.reports, second.reports);
        assert_eq!(first.reports.len(), 4);
        assert!(first.reports.iter().all(|r| r.next_validators.is_some()));
        // votes cast before the first epoch are active from the second on
        assert!(first.reports[1].activations > 0);
        assert!(!first.reports[2].voter_rewards.is_empty());
    }

    #[test]
    fn test_simulate_command_output() {
        let output = run(&["simulate", "--validators", "3", "--voters", "5", "--epochs", "2", "--events"]).unwrap();
        assert!(output.contains("epoch 1:"));
        assert!(output.contains("epoch 2:"));
        assert!(output.contains("\"event\": \"EpochProcessed\""));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert!(run(&["frobnicate"]).is_err());
    }
}
