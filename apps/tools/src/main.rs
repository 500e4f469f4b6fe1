use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::ApiContext;
use shared::domain::UserId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://taskboard.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateUser {
        username: String,
        email: String,
        password: String,
    },
    AddTask {
        user_id: i64,
        title: String,
    },
    ListTasks {
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateUser {
            username,
            email,
            password,
        } => {
            let ctx = ApiContext { storage };
            let user_id = server_api::signup(&ctx, &username, &email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e.message))?;
            println!("created user_id={}", user_id.0);
        }
        Command::AddTask { user_id, title } => {
            let task = storage.create_task(UserId(user_id), &title).await?;
            println!("created task_id={}", task.task_id.0);
        }
        Command::ListTasks { user_id } => {
            for task in storage.list_tasks_for_user(UserId(user_id)).await? {
                println!(
                    "{}\t{}\t{}",
                    task.task_id.0,
                    if task.completed { "done" } else { "open" },
                    task.title
                );
            }
        }
    }

    Ok(())
}
