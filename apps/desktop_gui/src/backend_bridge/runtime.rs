//! Backend worker: a dedicated thread with its own tokio runtime that
//! drains the UI command queue and reports results as UI events.

use std::thread;

use client_core::{ClientEvent, TaskClient};
use crossbeam_channel::{Receiver, Sender};
use shared::protocol::ServerEvent;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_command_loop(cmd_rx, ui_tx));
    });
}

async fn run_command_loop(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

    let mut client: Option<TaskClient> = None;
    let mut event_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::Signup {
                server_url,
                username,
                email,
                password,
            } => {
                tracing::info!("backend: signup");
                let signup_client = TaskClient::new(&server_url);
                match signup_client.signup(&username, &email, &password).await {
                    Ok(user_id) => {
                        tracing::info!(user_id = user_id.0, "backend: signup ok");
                        let _ = ui_tx.try_send(UiEvent::SignupOk);
                    }
                    Err(err) => {
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::Signup,
                            err.to_string(),
                        )));
                    }
                }
            }
            BackendCommand::Login {
                server_url,
                username,
                password,
            } => {
                tracing::info!("backend: login");
                let mut fresh = TaskClient::new(&server_url);
                let user_id = match fresh.login(&username, &password).await {
                    Ok(user_id) => user_id,
                    Err(err) => {
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::Login,
                            err.to_string(),
                        )));
                        continue;
                    }
                };

                if let Some(task) = event_task.take() {
                    task.abort();
                }
                match fresh.connect_events().await {
                    Ok(()) => {
                        let mut events = fresh.subscribe_events();
                        let ui_tx_clone = ui_tx.clone();
                        event_task = Some(tokio::spawn(async move {
                            while let Ok(event) = events.recv().await {
                                let forwarded = match event {
                                    ClientEvent::Server(event) => UiEvent::Server(event),
                                    ClientEvent::Error(message) => UiEvent::Error(
                                        UiError::from_message(UiErrorContext::General, message),
                                    ),
                                };
                                let _ = ui_tx_clone.try_send(forwarded);
                            }
                        }));
                    }
                    Err(err) => {
                        // Session stays usable without the stream; refresh is manual.
                        tracing::warn!(%err, "event stream unavailable");
                        let _ = ui_tx.try_send(UiEvent::Info(
                            "Live task updates unavailable; refresh manually".to_string(),
                        ));
                    }
                }

                client = Some(fresh);
                let _ = ui_tx.try_send(UiEvent::LoginOk { user_id, username });
            }
            BackendCommand::ListTasks => {
                tracing::info!("backend: list_tasks");
                let Some(client) = client.as_ref() else {
                    report_logged_out(&ui_tx);
                    continue;
                };
                match client.list_tasks().await {
                    Ok(tasks) => {
                        let _ = ui_tx.try_send(UiEvent::TasksLoaded(tasks));
                    }
                    Err(err) => {
                        tracing::error!("backend: list_tasks failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::General,
                            err.to_string(),
                        )));
                    }
                }
            }
            BackendCommand::CreateTask { title } => {
                tracing::info!(title_len = title.len(), "backend: create_task");
                let Some(client) = client.as_ref() else {
                    report_logged_out(&ui_tx);
                    continue;
                };
                match client.create_task(&title).await {
                    Ok(task) => {
                        let _ = ui_tx.try_send(UiEvent::Server(ServerEvent::TaskCreated { task }));
                    }
                    Err(err) => {
                        tracing::error!("backend: create_task failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::SaveTask,
                            err.to_string(),
                        )));
                    }
                }
            }
            BackendCommand::UpdateTask {
                task_id,
                title,
                completed,
            } => {
                tracing::info!(task_id = task_id.0, "backend: update_task");
                let Some(client) = client.as_ref() else {
                    report_logged_out(&ui_tx);
                    continue;
                };
                match client.update_task(task_id, &title, completed).await {
                    Ok(task) => {
                        let _ = ui_tx.try_send(UiEvent::Server(ServerEvent::TaskUpdated { task }));
                    }
                    Err(err) => {
                        tracing::error!(task_id = task_id.0, "backend: update_task failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::SaveTask,
                            err.to_string(),
                        )));
                    }
                }
            }
            BackendCommand::DeleteTask { task_id } => {
                tracing::info!(task_id = task_id.0, "backend: delete_task");
                let Some(client) = client.as_ref() else {
                    report_logged_out(&ui_tx);
                    continue;
                };
                match client.delete_task(task_id).await {
                    Ok(()) => {
                        if let Some(user_id) = client.user_id() {
                            let _ = ui_tx.try_send(UiEvent::Server(ServerEvent::TaskDeleted {
                                user_id,
                                task_id,
                            }));
                        }
                    }
                    Err(err) => {
                        tracing::error!(task_id = task_id.0, "backend: delete_task failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::SaveTask,
                            err.to_string(),
                        )));
                    }
                }
            }
        }
    }
}

fn report_logged_out(ui_tx: &Sender<UiEvent>) {
    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
        UiErrorContext::General,
        "not logged in",
    )));
}
