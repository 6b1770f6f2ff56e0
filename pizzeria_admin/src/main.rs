use std::{error::Error, process::ExitCode, sync::Arc};

use clap::{Args, Parser, Subcommand};
use pizzeria::{
    domain::{
        customer::{Customer, CustomerError, CustomerId, CustomerRepository},
        Entity,
    },
    infrastructure::{customer::ObjectStoreCustomerRepository, s3::S3ObjectStorage},
    PizzeriaConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "pizzeria-admin", about = "Manage pizzeria customers in object storage", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new customer
    Add {
        /// Use this identifier instead of generating one
        #[arg(long)]
        id: Option<CustomerId>,
        #[command(flatten)]
        fields: Fields,
    },
    /// Show a customer
    Get { id: CustomerId },
    /// Change fields of an existing customer
    Update {
        id: CustomerId,
        #[command(flatten)]
        fields: Fields,
    },
    /// Delete a customer
    Remove { id: CustomerId },
    /// Show all customers
    List,
}

/// Customer attributes. An empty string clears an optional field.
#[derive(Args, Debug, Default)]
struct Fields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

impl Fields {
    fn apply(self, customer: &mut Customer) -> Result<(), CustomerError> {
        if let Some(name) = self.name {
            customer.change_name(name)?;
        }
        if let Some(email) = self.email {
            customer.change_email(non_empty(email));
        }
        if let Some(phone) = self.phone {
            customer.change_phone(non_empty(phone));
        }
        if let Some(address) = self.address {
            customer.change_address(non_empty(address));
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    match value.trim().is_empty() {
        true => None,
        false => Some(value),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    match PizzeriaConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .with_writer(std::io::stderr)
                .init();
            if let Err(error) = execute(&config, cli.command).await {
                error!("コマンド実行エラー: {}", error);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            error!("設定読み込みエラー: {}", error);
            ExitCode::FAILURE
        }
    }
}

async fn execute(config: &PizzeriaConfig, command: Command) -> Result<(), Box<dyn Error>> {
    let token = CancellationToken::new();
    let repo = ObjectStoreCustomerRepository::new(
        Arc::new(S3ObjectStorage::new(&config.storage)),
        &config.storage,
    )
    .with_cancellation(token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("中断要求を受信しました");
            token.cancel();
        }
    });
    run(&repo, command).await
}

async fn run<R: CustomerRepository>(repo: &R, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Add { id, fields } => {
            let name = fields.name.clone().unwrap_or_default();
            let mut customer = match id {
                Some(id) => Customer::with_id(id, name)?,
                None => Customer::new(name)?,
            };
            fields.apply(&mut customer)?;
            let id = repo.add(&mut customer).await?;
            info!(%id, "顧客を登録しました");
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        Command::Get { id } => {
            let customer = repo.require(id).await?;
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        Command::Update { id, fields } => {
            let Some(mut customer) = repo.find_by_id(id).await? else {
                warn!(%id, "顧客が存在しないため更新しませんでした");
                return Ok(());
            };
            fields.apply(&mut customer)?;
            if repo.update(&customer).await? {
                info!(%id, "顧客を更新しました");
                println!("{}", serde_json::to_string_pretty(&customer)?);
            } else {
                warn!(%id, "顧客が存在しないため更新しませんでした");
            }
        }
        Command::Remove { id } => {
            repo.remove(id).await?;
            info!(%id, "顧客を削除しました");
        }
        Command::List => {
            let listing = repo.list().await?;
            info!(
                entity = Customer::ENTITY_NAME,
                count = listing.entities.len(),
                skipped = listing.skipped.len(),
                "顧客一覧を取得しました"
            );
            for skipped in &listing.skipped {
                eprintln!("skipped {}: {}", skipped.key, skipped.reason);
            }
            println!("{}", serde_json::to_string_pretty(&listing.entities)?);
        }
    }
    Ok(())
}
