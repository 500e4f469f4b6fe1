use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::TaskClient;
use shared::domain::TaskId;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8780")]
    server_url: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tasks as JSON lines (the default).
    List,
    /// Create a task.
    Add { title: String },
    /// Rename a task, keeping its completed flag.
    Rename { task_id: i64, title: String },
    /// Toggle a task's completed flag.
    Toggle { task_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut client = TaskClient::new(args.server_url);
    let user_id = client.login(&args.username, &args.password).await?;
    tracing::info!(user_id = user_id.0, "logged in");

    match args.command.unwrap_or(Command::List) {
        Command::List => {
            for task in client.list_tasks().await? {
                println!("{}", serde_json::to_string(&task)?);
            }
        }
        Command::Add { title } => {
            let task = client.create_task(&title).await?;
            println!("{}", serde_json::to_string(&task)?);
        }
        Command::Rename { task_id, title } => {
            let current = client
                .list_tasks()
                .await?
                .into_iter()
                .find(|task| task.task_id.0 == task_id);
            let completed = current.map(|task| task.completed).unwrap_or(false);
            let task = client
                .update_task(TaskId(task_id), &title, completed)
                .await?;
            println!("{}", serde_json::to_string(&task)?);
        }
        Command::Toggle { task_id } => {
            let current = client
                .list_tasks()
                .await?
                .into_iter()
                .find(|task| task.task_id.0 == task_id)
                .ok_or_else(|| anyhow::anyhow!("no task with id {task_id}"))?;
            let task = client
                .update_task(TaskId(task_id), &current.title, !current.completed)
                .await?;
            println!("{}", serde_json::to_string(&task)?);
        }
    }

    Ok(())
}
