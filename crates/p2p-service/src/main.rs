use anyhow::{bail, Context, Result};
use clap::Parser;
use p2p_catalog::resolve_payment_method_hash;
use p2p_config::ConfigLoader;
use p2p_types::{
	parse_bytes32, parse_uint_str, truncate_hash, Address, QuoteRequest, TransactionReceipt, U256,
};
use serde::Serialize;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod prover;
mod service;

use cli::{Args, Command, QuoteArgs};
use service::ClientService;

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	// Command line wins over the configured level
	let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
	setup_tracing(log_level)?;

	let service = ClientService::new(config).context("Failed to build client")?;
	run(&args, service).await
}

async fn run(args: &Args, service: ClientService) -> Result<()> {
	match args.command.clone() {
		Command::Validate => return validate_config(args, &service),
		Command::ResolveMethod { name } => {
			let network = &service.config().network;
			let hash = resolve_payment_method_hash(
				&name,
				service.catalogs(),
				network.environment,
				&network.name,
			)?;
			println!("{}", hash);
		}
		Command::Gas => print_json(&service.submitter().gas_quote().await)?,
		Command::Deposit { id } => {
			let view = service.maker().deposit(parse_uint(&id, "deposit id")?).await?;
			print_json(&view)?;
		}
		Command::Intent { owner } => {
			let owner = parse_address(&owner, "owner")?;
			let maker = service.maker();
			match maker.account_intent(owner).await? {
				Some(hash) => print_json(&maker.intent(hash).await?)?,
				None => println!("No open intent for {}", owner),
			}
		}
		Command::Quote(quote) => {
			let request = quote_request(&service, quote)?;
			let mut flow = service.new_flow();
			let quotes = flow.fetch_quotes(request).await?;
			print_json(quotes)?;
		}
		Command::Signal { quote, index } => {
			let request = quote_request(&service, quote)?;
			let mut flow = service.new_flow();
			let count = flow.fetch_quotes(request).await?.len();
			if count == 0 {
				bail!("No liquidity for the requested amount");
			}

			let intent_hash = flow.signal(index).await?;
			flow.await_payment()?;
			info!(
				flow_id = %flow.id(),
				intent_hash = %truncate_hash(&intent_hash.to_string()),
				"Intent signaled; pay off-chain, then run fulfill"
			);
			println!("{}", intent_hash);
		}
		Command::Fulfill { hash, proofs } => {
			let intent_hash = parse_bytes32(&hash).context("Invalid intent hash")?;
			let mut flow = service.resume_flow(intent_hash, proofs).await?;
			flow.await_payment()?;
			let receipt = flow.fulfill().await?;
			report("fulfill", &receipt);
		}
		Command::Cancel { hash } => {
			let intent_hash = parse_bytes32(&hash).context("Invalid intent hash")?;
			let mut flow = service.resume_flow(intent_hash, Vec::new()).await?;
			let receipt = flow.cancel().await?;
			report("cancel", &receipt);
		}
		Command::Release { hash } => {
			let intent_hash = parse_bytes32(&hash).context("Invalid intent hash")?;
			let receipt = service.maker().release_funds_to_payer(intent_hash).await?;
			report("release", &receipt);
		}
		Command::Withdraw { id } => {
			let deposit_id = parse_uint(&id, "deposit id")?;
			let receipt = service.maker().withdraw_deposit(deposit_id).await?;
			report("withdraw", &receipt);
		}
	}
	Ok(())
}

fn validate_config(args: &Args, service: &ClientService) -> Result<()> {
	let config = service.config();
	info!("Configuration is valid: {:?}", args.config);
	info!("Network: {} (chain {})", config.network.name, config.network.chain_id);
	info!("Escrow: {}", config.network.escrow_address);
	info!("Sender: {}", service.sender());
	info!("API: {}", config.api.base_url);
	info!("Single intent enforced: {}", config.flow.enforce_single_intent);
	info!(
		"Catalog: {}",
		config
			.catalog
			.path
			.as_ref()
			.map(|path| path.display().to_string())
			.unwrap_or_else(|| "none".to_string())
	);
	Ok(())
}

fn quote_request(service: &ClientService, args: QuoteArgs) -> Result<QuoteRequest> {
	let recipient = args
		.recipient
		.as_deref()
		.map(|value| parse_address(value, "recipient"))
		.transpose()?;
	let token = match args.token.as_deref() {
		Some(value) => parse_address(value, "token")?,
		None => Address::ZERO,
	};
	Ok(service.quote_request(args.amount, args.currency, args.platforms, recipient, token))
}

fn parse_uint(value: &str, what: &str) -> Result<U256> {
	parse_uint_str(value).map_err(|e| anyhow::anyhow!("Invalid {}: {}", what, e))
}

fn parse_address(value: &str, what: &str) -> Result<Address> {
	Address::from_str(value).with_context(|| format!("Invalid {} address", what))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn report(outcome: &str, receipt: &TransactionReceipt) {
	info!(
		tx_hash = %truncate_hash(&receipt.hash.to_string()),
		block = receipt.block_number,
		outcome,
		"Transaction confirmed"
	);
	println!("{}", receipt.hash);
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
