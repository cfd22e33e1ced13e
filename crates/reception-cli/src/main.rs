use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "reception", about = "Showroom reception CLI")]
struct Cli {
    /// Connect to the system bus instead of the session bus.
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the visitor in an image and log a visit on a match
    Recognize {
        /// Path to the captured image
        image: String,
        /// Match every face in the image instead of just one
        #[arg(long)]
        all: bool,
    },
    /// Register a face image for an existing client
    RegisterFace {
        client_id: i64,
        /// Path to the face image
        image: String,
    },
    /// Rank the catalog for a client without logging a visit
    Recommend {
        client_id: i64,
        /// Number of cars to return
        #[arg(short, long, default_value_t = 3)]
        limit: u32,
    },
    /// Manage client records
    #[command(subcommand)]
    Client(ClientCommands),
    /// Manage the car catalog
    #[command(subcommand)]
    Car(CarCommands),
    /// List visits without an exit time
    Visits,
    /// Close a visit by its event id
    Exit { visit_id: String },
    /// Visit analytics over a trailing window
    Analytics {
        /// Window size in days
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Show daemon status
    Status,
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Create a client record
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Male or Female
        #[arg(long)]
        gender: String,
        #[arg(long)]
        age: i32,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long, default_value = "")]
        marital_status: String,
        #[arg(long, default_value = "")]
        job_title: String,
        #[arg(long)]
        has_car: bool,
        /// Yes or No; omit when unknown
        #[arg(long)]
        has_credit: Option<String>,
        #[arg(long, default_value_t = 0)]
        family_members: i32,
        #[arg(long)]
        is_student: bool,
        #[arg(long)]
        workplace: Option<String>,
    },
    /// List all clients
    List,
    /// Remove a client and their face registrations
    Remove { client_id: i64 },
}

#[derive(Subcommand)]
enum CarCommands {
    /// Add a car to the catalog
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        year: i32,
        /// sedan, suv, hatchback, minivan, ...
        #[arg(long)]
        category: String,
        /// Feature flags the scoring rules read, e.g. --feature family_friendly
        #[arg(long = "feature")]
        features: Vec<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List the catalog
    List,
    /// Remove a car from the catalog
    Remove { car_id: i64 },
}

#[zbus::proxy(
    interface = "org.autoclient.Reception1",
    default_service = "org.autoclient.Reception1",
    default_path = "/org/autoclient/Reception1"
)]
trait Reception {
    async fn recognize(&self, image_path: &str) -> zbus::Result<String>;
    async fn recognize_all(&self, image_path: &str) -> zbus::Result<String>;
    async fn register_face(&self, client_id: i64, image_path: &str) -> zbus::Result<String>;
    async fn recommend(&self, client_id: i64, limit: u32) -> zbus::Result<String>;
    async fn create_client(&self, client_json: &str) -> zbus::Result<String>;
    async fn add_car(&self, car_json: &str) -> zbus::Result<String>;
    async fn list_cars(&self) -> zbus::Result<String>;
    async fn remove_car(&self, car_id: i64) -> zbus::Result<bool>;
    async fn list_clients(&self) -> zbus::Result<String>;
    async fn remove_client(&self, client_id: i64) -> zbus::Result<bool>;
    async fn open_visits(&self) -> zbus::Result<String>;
    async fn record_exit(&self, visit_id: &str) -> zbus::Result<bool>;
    async fn analytics(&self, days: u32) -> zbus::Result<String>;
    async fn status(&self) -> zbus::Result<String>;
}

/// Re-indent a JSON reply for the terminal.
fn print_json(payload: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(payload).context("daemon returned malformed JSON")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = if cli.system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("connecting to the bus (is receptiond running?)")?;
    let proxy = ReceptionProxy::new(&conn).await?;

    match cli.command {
        Commands::Recognize { image, all } => {
            let reply = if all {
                proxy.recognize_all(&image).await?
            } else {
                proxy.recognize(&image).await?
            };
            print_json(&reply)?;
        }
        Commands::RegisterFace { client_id, image } => {
            print_json(&proxy.register_face(client_id, &image).await?)?;
        }
        Commands::Recommend { client_id, limit } => {
            print_json(&proxy.recommend(client_id, limit).await?)?;
        }
        Commands::Client(cmd) => match cmd {
            ClientCommands::Add {
                first_name,
                last_name,
                gender,
                age,
                phone,
                budget,
                marital_status,
                job_title,
                has_car,
                has_credit,
                family_members,
                is_student,
                workplace,
            } => {
                let payload = json!({
                    "first_name": first_name,
                    "last_name": last_name,
                    "gender": gender,
                    "age": age,
                    "phone": phone,
                    "budget": budget,
                    "marital_status": marital_status,
                    "job_title": job_title,
                    "has_car": has_car,
                    "has_credit": has_credit.unwrap_or_else(|| "Unknown".into()),
                    "family_members": family_members,
                    "is_student": is_student,
                    "workplace": workplace,
                });
                print_json(&proxy.create_client(&payload.to_string()).await?)?;
            }
            ClientCommands::List => {
                print_json(&proxy.list_clients().await?)?;
            }
            ClientCommands::Remove { client_id } => {
                if proxy.remove_client(client_id).await? {
                    println!("client {client_id} removed");
                } else {
                    println!("client {client_id} not found");
                }
            }
        },
        Commands::Car(cmd) => match cmd {
            CarCommands::Add {
                name,
                brand,
                model,
                price,
                year,
                category,
                features,
                image_url,
            } => {
                let features: serde_json::Map<String, serde_json::Value> = features
                    .into_iter()
                    .map(|f| (f, serde_json::Value::Bool(true)))
                    .collect();
                let payload = json!({
                    "name": name,
                    "brand": brand,
                    "model": model,
                    "price": price,
                    "year": year,
                    "category": category,
                    "features": features,
                    "image_url": image_url,
                });
                print_json(&proxy.add_car(&payload.to_string()).await?)?;
            }
            CarCommands::List => {
                print_json(&proxy.list_cars().await?)?;
            }
            CarCommands::Remove { car_id } => {
                if proxy.remove_car(car_id).await? {
                    println!("car {car_id} removed");
                } else {
                    println!("car {car_id} not found");
                }
            }
        },
        Commands::Visits => {
            print_json(&proxy.open_visits().await?)?;
        }
        Commands::Exit { visit_id } => {
            if proxy.record_exit(&visit_id).await? {
                println!("visit {visit_id} closed");
            } else {
                println!("visit {visit_id} not found");
            }
        }
        Commands::Analytics { days } => {
            print_json(&proxy.analytics(days).await?)?;
        }
        Commands::Status => {
            print_json(&proxy.status().await?)?;
        }
    }

    Ok(())
}
