use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{TaskId, UserId},
    protocol::{ServerEvent, TaskPayload},
};
use zeroize::Zeroize;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::edit_list::{
    CommitOutcome, EditKey, InlineEditController, TaskRow,
};
use crate::controller::events::{
    classify_login_failure, classify_signup_failure, err_label, UiErrorContext, UiEvent,
};
use crate::controller::orchestration::dispatch_backend_command;

const SETTINGS_STORAGE_KEY: &str = "taskboard_desktop_settings";

fn lighten_color(c: egui::Color32, t: f32) -> egui::Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let channel = channel as f32;
        (channel + (255.0 - channel) * t).round().clamp(0.0, 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(mix(c.r()), mix(c.g()), mix(c.b()), c.a())
}

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
    pub username: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8780".to_string(),
            username: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedDesktopSettings {
    server_url: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Signup,
    Login,
    Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Info,
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusField {
    Server,
    Username,
    Password,
    SignupUsername,
    SignupEmail,
    SignupPassword,
}

#[derive(Debug, Default)]
struct SignupFormState {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitTrigger {
    ConfirmKey,
    FocusLost,
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    server_url: String,
    username: String,
    login_password: String,
    signup: SignupFormState,

    auth_session_established: bool,
    user_id: Option<UserId>,
    view_state: AppViewState,
    view_only: bool,
    request_in_flight: bool,

    tasks: Vec<TaskPayload>,
    edit: InlineEditController,
    focus_active_edit: bool,
    composer: String,
    detail_task: Option<TaskId>,

    status: String,
    status_banner: Option<StatusBanner>,
    focus: Option<FocusField>,
}

impl DesktopGuiApp {
    fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted_settings: Option<PersistedDesktopSettings>,
        startup: StartupConfig,
    ) -> Self {
        let persisted = persisted_settings.unwrap_or_default();
        let server_url = if startup.server_url.is_empty() {
            persisted
                .server_url
                .unwrap_or_else(|| StartupConfig::default().server_url)
        } else {
            startup.server_url
        };
        let username = if startup.username.is_empty() {
            persisted.username.unwrap_or_default()
        } else {
            startup.username
        };

        Self {
            cmd_tx,
            ui_rx,
            server_url,
            username,
            login_password: String::new(),
            signup: SignupFormState::default(),
            auth_session_established: false,
            user_id: None,
            view_state: AppViewState::Login,
            view_only: false,
            request_in_flight: false,
            tasks: Vec::new(),
            edit: InlineEditController::new(),
            focus_active_edit: false,
            composer: String::new(),
            detail_task: None,
            status: "Not signed in".to_string(),
            status_banner: None,
            focus: None,
        }
    }

    pub fn from_eframe(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        cc: &eframe::CreationContext<'_>,
        startup: StartupConfig,
    ) -> Self {
        let persisted_settings = cc.storage.and_then(|storage| {
            storage
                .get_string(SETTINGS_STORAGE_KEY)
                .and_then(|text| serde_json::from_str::<PersistedDesktopSettings>(&text).ok())
        });
        Self::new(cmd_tx, ui_rx, persisted_settings, startup)
    }

    /// Edit-mode gate for the whole board; all inline editing is a no-op
    /// while this is false.
    fn edit_enabled(&self) -> bool {
        self.auth_session_established && !self.view_only
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::SignupOk => {
                    self.request_in_flight = false;
                    self.username = self.signup.username.trim().to_string();
                    self.signup.password.zeroize();
                    self.signup.username.clear();
                    self.signup.email.clear();
                    self.view_state = AppViewState::Login;
                    self.status = "Account created".to_string();
                    self.status_banner = Some(StatusBanner {
                        severity: StatusBannerSeverity::Info,
                        message: "Account created. Sign in to continue.".to_string(),
                    });
                    self.focus = Some(FocusField::Password);
                }
                UiEvent::LoginOk { user_id, username } => {
                    self.request_in_flight = false;
                    self.auth_session_established = true;
                    self.user_id = Some(user_id);
                    self.username = username;
                    self.login_password.zeroize();
                    self.view_state = AppViewState::Board;
                    self.status = "Signed in - loading tasks".to_string();
                    self.status_banner = None;
                    self.tasks.clear();
                    self.edit = InlineEditController::new();
                    self.detail_task = None;
                    self.view_only = false;
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ListTasks,
                        &mut self.status,
                    );
                }
                UiEvent::TasksLoaded(tasks) => {
                    self.tasks = tasks;
                    self.status = match self.tasks.len() {
                        0 => "No tasks yet".to_string(),
                        1 => "1 task".to_string(),
                        n => format!("{n} tasks"),
                    };
                }
                UiEvent::Server(event) => self.merge_server_event(event),
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.request_in_flight = false;
                    if err.requires_reauth() {
                        self.sign_out();
                        self.status = format!("Authentication error: {}", err.message());
                        self.status_banner = Some(StatusBanner {
                            severity: StatusBannerSeverity::Error,
                            message:
                                "Session expired or invalid credentials. Please sign in again."
                                    .to_string(),
                        });
                        self.focus = Some(FocusField::Password);
                    } else {
                        match err.context() {
                            UiErrorContext::Signup => {
                                self.status = format!("Signup failed: {}", err.message());
                                self.status_banner = Some(StatusBanner {
                                    severity: StatusBannerSeverity::Error,
                                    message: classify_signup_failure(&err),
                                });
                            }
                            UiErrorContext::Login => {
                                self.status = classify_login_failure(err.message());
                                self.status_banner = Some(StatusBanner {
                                    severity: StatusBannerSeverity::Error,
                                    message: self.status.clone(),
                                });
                            }
                            UiErrorContext::BackendStartup | UiErrorContext::SaveTask => {
                                self.status = format!(
                                    "{} error: {}",
                                    err_label(err.category()),
                                    err.message()
                                );
                                self.status_banner = Some(StatusBanner {
                                    severity: StatusBannerSeverity::Error,
                                    message: self.status.clone(),
                                });
                            }
                            UiErrorContext::General => {
                                self.status = format!(
                                    "{} error: {}",
                                    err_label(err.category()),
                                    err.message()
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    /// The external owner's merge duty: fold authoritative task events into
    /// the local collection by id.
    fn merge_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::TaskCreated { task } | ServerEvent::TaskUpdated { task } => {
                if self.user_id != Some(task.user_id) {
                    return;
                }
                if let Some(existing) =
                    self.tasks.iter_mut().find(|t| t.task_id == task.task_id)
                {
                    *existing = task;
                } else {
                    self.tasks.push(task);
                }
            }
            ServerEvent::TaskDeleted { task_id, .. } => {
                self.tasks.retain(|t| t.task_id != task_id);
                if self.detail_task == Some(task_id) {
                    self.detail_task = None;
                }
            }
            ServerEvent::Error(err) => {
                self.status = format!("Server event error: {}", err.message);
            }
        }
    }

    fn sign_out(&mut self) {
        self.auth_session_established = false;
        self.user_id = None;
        self.view_state = AppViewState::Login;
        self.tasks.clear();
        self.edit = InlineEditController::new();
        self.detail_task = None;
        self.composer.clear();
        self.status = "Signed out".to_string();
        self.status_banner = None;
    }

    fn try_login(&mut self) {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            self.status = "Username is required".to_string();
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: "Please enter a username.".to_string(),
            });
            self.focus = Some(FocusField::Username);
            return;
        }

        let server_url = self.server_url.trim().trim_end_matches('/').to_string();
        if server_url.is_empty() {
            self.status = "Server URL is required".to_string();
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: "Please enter a server URL.".to_string(),
            });
            self.focus = Some(FocusField::Server);
            return;
        }

        self.request_in_flight = true;
        self.status = "Signing in...".to_string();
        self.status_banner = None;
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Login {
                server_url,
                username,
                password: self.login_password.clone(),
            },
            &mut self.status,
        );
    }

    fn try_signup(&mut self) {
        let username = self.signup.username.trim().to_string();
        if username.is_empty() {
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: "Please enter a username.".to_string(),
            });
            self.focus = Some(FocusField::SignupUsername);
            return;
        }
        let email = self.signup.email.trim().to_string();
        if email.is_empty() {
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: "Please enter an email address.".to_string(),
            });
            self.focus = Some(FocusField::SignupEmail);
            return;
        }

        let server_url = self.server_url.trim().trim_end_matches('/').to_string();
        self.request_in_flight = true;
        self.status = "Creating account...".to_string();
        self.status_banner = None;
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Signup {
                server_url,
                username,
                email,
                password: self.signup.password.clone(),
            },
            &mut self.status,
        );
    }

    fn show_status_banner(&self, ui: &mut egui::Ui) {
        let Some(banner) = &self.status_banner else {
            return;
        };
        let (fill, text_color) = match banner.severity {
            StatusBannerSeverity::Error => (
                ui.visuals().error_fg_color.gamma_multiply(0.15),
                ui.visuals().error_fg_color,
            ),
            StatusBannerSeverity::Info => (
                ui.visuals().selection.bg_fill.gamma_multiply(0.25),
                ui.visuals().strong_text_color(),
            ),
        };
        egui::Frame::NONE
            .fill(fill)
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.colored_label(text_color, &banner.message);
            });
    }

    // ---------- Form helpers (stable IDs + stacked layout) ----------

    fn form_text_field(
        ui: &mut egui::Ui,
        id: &'static str,
        label: &str,
        hint: &str,
        value: &mut String,
        masked: bool,
        should_focus: bool,
    ) -> egui::Response {
        ui.label(egui::RichText::new(label).strong());
        let edit = egui::TextEdit::singleline(value)
            .id_salt(id)
            .hint_text(
                egui::RichText::new(hint)
                    .color(ui.visuals().weak_text_color().gamma_multiply(0.85)),
            )
            .password(masked)
            .desired_width(f32::INFINITY);

        let response = ui.add_sized([ui.available_width(), 34.0], edit);
        if should_focus {
            response.request_focus();
        }
        response
    }

    fn form_card<R>(
        ui: &mut egui::Ui,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let card_fill = lighten_color(ui.visuals().panel_fill, 0.02);
        egui::Frame::NONE
            .fill(card_fill)
            .corner_radius(14.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20, 18))
            .show(ui, |ui| {
                ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);
                add_contents(ui)
            })
            .inner
    }

    fn show_login_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let card_width = avail.x.clamp(420.0, 540.0);
            ui.add_space((avail.y * 0.12).clamp(18.0, 90.0));

            let focus_to_set = self.focus.take();

            ui.vertical_centered(|ui| {
                ui.set_width(card_width);
                Self::form_card(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new("✔").size(24.0));
                        ui.vertical(|ui| {
                            ui.heading("Taskboard");
                            ui.weak("Sign in to your task list.");
                        });
                    });

                    ui.add_space(8.0);
                    self.show_status_banner(ui);

                    let mut server_url_buf = self.server_url.clone();
                    let mut username_buf = self.username.clone();
                    let mut password_buf = self.login_password.clone();

                    let server_resp = Self::form_text_field(
                        ui,
                        "login_server_url",
                        "Server URL",
                        "http://127.0.0.1:8780",
                        &mut server_url_buf,
                        false,
                        focus_to_set == Some(FocusField::Server),
                    );
                    ui.add_space(6.0);
                    let user_resp = Self::form_text_field(
                        ui,
                        "login_username",
                        "Username",
                        "alice",
                        &mut username_buf,
                        false,
                        focus_to_set == Some(FocusField::Username),
                    );
                    ui.add_space(6.0);
                    let password_resp = Self::form_text_field(
                        ui,
                        "login_password",
                        "Password",
                        "••••••••",
                        &mut password_buf,
                        true,
                        focus_to_set == Some(FocusField::Password),
                    );

                    self.server_url = server_url_buf;
                    self.username = username_buf;
                    self.login_password = password_buf;

                    // Enter submits when any field has focus
                    let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                    let can_submit = server_resp.has_focus()
                        || user_resp.has_focus()
                        || password_resp.has_focus();
                    if can_submit && enter_pressed && !self.request_in_flight {
                        self.try_login();
                    }

                    ui.add_space(10.0);
                    let button = egui::Button::new(
                        egui::RichText::new("Sign in").strong().size(16.0),
                    )
                    .min_size(egui::vec2(ui.available_width(), 40.0));
                    if ui.add_enabled(!self.request_in_flight, button).clicked() {
                        self.try_login();
                    }

                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.small("Need an account?");
                        if ui.small_button("Create one").clicked() {
                            self.view_state = AppViewState::Signup;
                            self.status_banner = None;
                            self.focus = Some(FocusField::SignupUsername);
                        }
                    });

                    ui.horizontal_wrapped(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
            });
        });
    }

    fn show_signup_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let card_width = avail.x.clamp(420.0, 540.0);
            ui.add_space((avail.y * 0.12).clamp(18.0, 90.0));

            let focus_to_set = self.focus.take();

            ui.vertical_centered(|ui| {
                ui.set_width(card_width);
                Self::form_card(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new("✔").size(24.0));
                        ui.vertical(|ui| {
                            ui.heading("Create your account");
                            ui.weak("A username, an email, and a password.");
                        });
                    });

                    ui.add_space(8.0);
                    self.show_status_banner(ui);

                    let mut username_buf = self.signup.username.clone();
                    let mut email_buf = self.signup.email.clone();
                    let mut password_buf = self.signup.password.clone();

                    let user_resp = Self::form_text_field(
                        ui,
                        "signup_username",
                        "Username",
                        "alice",
                        &mut username_buf,
                        false,
                        focus_to_set == Some(FocusField::SignupUsername),
                    );
                    ui.add_space(6.0);
                    let email_resp = Self::form_text_field(
                        ui,
                        "signup_email",
                        "Email",
                        "alice@example.com",
                        &mut email_buf,
                        false,
                        focus_to_set == Some(FocusField::SignupEmail),
                    );
                    ui.add_space(6.0);
                    let password_resp = Self::form_text_field(
                        ui,
                        "signup_password",
                        "Password",
                        "at least 8 characters",
                        &mut password_buf,
                        true,
                        focus_to_set == Some(FocusField::SignupPassword),
                    );

                    self.signup.username = username_buf;
                    self.signup.email = email_buf;
                    self.signup.password = password_buf;

                    let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                    let can_submit = user_resp.has_focus()
                        || email_resp.has_focus()
                        || password_resp.has_focus();
                    if can_submit && enter_pressed && !self.request_in_flight {
                        self.try_signup();
                    }

                    ui.add_space(10.0);
                    let button = egui::Button::new(
                        egui::RichText::new("Sign Up").strong().size(16.0),
                    )
                    .min_size(egui::vec2(ui.available_width(), 40.0));
                    if ui.add_enabled(!self.request_in_flight, button).clicked() {
                        self.try_signup();
                    }

                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.small("Already have an account?");
                        if ui.small_button("Sign in").clicked() {
                            self.view_state = AppViewState::Login;
                            self.status_banner = None;
                            self.focus = Some(FocusField::Username);
                        }
                    });

                    ui.horizontal_wrapped(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
            });
        });
    }

    fn show_board(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("board_topbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Taskboard");
                ui.separator();
                ui.weak(&self.username);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign out").clicked() {
                        self.sign_out();
                    }
                    if ui.button("Refresh").clicked() {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::ListTasks,
                            &mut self.status,
                        );
                    }
                    ui.toggle_value(&mut self.view_only, "View only");
                });
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("board_statusbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.small("Status:");
                ui.small(egui::RichText::new(&self.status).weak());
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_status_banner(ui);
            ui.add_space(6.0);

            if self.edit_enabled() {
                self.show_composer_row(ui);
                ui.add_space(6.0);
                ui.separator();
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    self.show_task_rows(ui);
                });
        });
    }

    fn show_composer_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let composer_resp = ui.add(
                egui::TextEdit::singleline(&mut self.composer)
                    .id_salt("task_composer")
                    .hint_text("Add a task...")
                    .desired_width(ui.available_width() - 64.0),
            );

            let submit_clicked = ui.button("Add").clicked();
            let enter_in_composer = composer_resp.lost_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter));

            if submit_clicked || enter_in_composer {
                let title = self.composer.trim().to_string();
                if title.is_empty() {
                    self.status = "Enter a task title first".to_string();
                } else {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::CreateTask { title },
                        &mut self.status,
                    );
                    self.composer.clear();
                    if enter_in_composer {
                        composer_resp.request_focus();
                    }
                }
            }
        });
    }

    fn show_task_rows(&mut self, ui: &mut egui::Ui) {
        if self.tasks.is_empty() {
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                ui.weak(if self.edit_enabled() {
                    "Nothing here yet. Add your first task above."
                } else {
                    "No tasks to show."
                });
            });
            return;
        }

        let edit_enabled = self.edit_enabled();
        let display: Vec<(TaskId, String, bool)> = self
            .tasks
            .iter()
            .map(|t| (t.task_id, t.title.clone(), t.completed))
            .collect();

        let mut begin_row: Option<TaskRow> = None;
        let mut commit_request: Option<(CommitTrigger, TaskId)> = None;
        let mut detail_request: Option<TaskId> = None;

        for (task_id, title, completed) in &display {
            ui.horizontal(|ui| {
                if edit_enabled && self.edit.is_editing(Some(*task_id)) {
                    let response = ui.add(
                        egui::TextEdit::singleline(self.edit.draft_mut())
                            .id_salt(("task_title_edit", task_id.0))
                            .desired_width(ui.available_width() - 72.0),
                    );
                    if self.focus_active_edit {
                        response.request_focus();
                        self.focus_active_edit = false;
                    }
                    if response.lost_focus() {
                        let trigger = if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                            CommitTrigger::ConfirmKey
                        } else {
                            CommitTrigger::FocusLost
                        };
                        commit_request = Some((trigger, *task_id));
                    }
                } else {
                    let mut text = egui::RichText::new(title);
                    if *completed {
                        text = text.strikethrough().weak();
                    }
                    let sense = if edit_enabled {
                        egui::Sense::click()
                    } else {
                        egui::Sense::hover()
                    };
                    let response = ui.add(egui::Label::new(text).sense(sense));
                    if edit_enabled {
                        let response =
                            response.on_hover_cursor(egui::CursorIcon::PointingHand);
                        if response.clicked() {
                            begin_row = Some(TaskRow {
                                task_id: Some(*task_id),
                                title: title.clone(),
                            });
                        }
                    }
                }

                if edit_enabled {
                    ui.with_layout(
                        egui::Layout::right_to_left(egui::Align::Center),
                        |ui| {
                            if ui.small_button("Details").clicked() {
                                detail_request = Some(*task_id);
                            }
                        },
                    );
                }
            });
            ui.add_space(2.0);
        }

        // Focus loss fires before the click that grabbed it: commit the old
        // session first, then retarget.
        if let Some((trigger, task_id)) = commit_request {
            self.commit_active_edit(trigger, Some(task_id));
        }
        if let Some(row) = begin_row {
            self.edit.begin_edit(edit_enabled, &row);
            self.focus_active_edit = true;
        }
        if let Some(task_id) = detail_request {
            self.open_task_details(Some(task_id));
        }
    }

    /// Secondary action forwarded from a row; not part of the edit state
    /// machine.
    fn open_task_details(&mut self, task_id: Option<TaskId>) {
        self.detail_task = task_id;
    }

    fn commit_active_edit(&mut self, trigger: CommitTrigger, task_id: Option<TaskId>) {
        let edit_enabled = self.edit_enabled();
        let rows: Vec<TaskRow> = self
            .tasks
            .iter()
            .map(|t| TaskRow {
                task_id: Some(t.task_id),
                title: t.title.clone(),
            })
            .collect();

        let mut committed: Option<TaskRow> = None;
        let outcome = match trigger {
            CommitTrigger::ConfirmKey => self.edit.handle_key(
                edit_enabled,
                EditKey::Confirm,
                task_id,
                &rows,
                |row| committed = Some(row),
            ),
            CommitTrigger::FocusLost => {
                self.edit
                    .handle_focus_lost(edit_enabled, task_id, &rows, |row| {
                        committed = Some(row)
                    })
            }
        };

        if let Some(row) = committed {
            self.apply_committed_row(row);
        }
        if outcome == CommitOutcome::TargetMissing {
            self.status = "Task disappeared before saving; edit discarded".to_string();
        }
    }

    fn apply_committed_row(&mut self, row: TaskRow) {
        let Some(task_id) = row.task_id else {
            return;
        };
        let mut completed = false;
        if let Some(task) = self.tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.title = row.title.clone();
            completed = task.completed;
        }
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::UpdateTask {
                task_id,
                title: row.title,
                completed,
            },
            &mut self.status,
        );
    }

    fn show_detail_dialog(&mut self, ctx: &egui::Context) {
        let Some(task_id) = self.detail_task else {
            return;
        };
        let Some(task) = self
            .tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
        else {
            self.detail_task = None;
            return;
        };

        let mut open = true;
        let mut close_requested = false;
        egui::Window::new("Task details")
            .id(egui::Id::new("task_detail_dialog"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(&task.title).strong());
                ui.small(format!(
                    "Created {}",
                    task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                ));
                ui.small(format!(
                    "Updated {}",
                    task.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                ));
                ui.add_space(8.0);

                let mut completed = task.completed;
                if ui.checkbox(&mut completed, "Completed").changed() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::UpdateTask {
                            task_id,
                            title: task.title.clone(),
                            completed,
                        },
                        &mut self.status,
                    );
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Delete task").clicked() {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::DeleteTask { task_id },
                            &mut self.status,
                        );
                        close_requested = true;
                    }
                    if ui.button("Close").clicked() {
                        close_requested = true;
                    }
                });
            });

        if !open || close_requested {
            self.detail_task = None;
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        match self.view_state {
            AppViewState::Signup => self.show_signup_screen(ctx),
            AppViewState::Login => self.show_login_screen(ctx),
            AppViewState::Board => {
                self.show_board(ctx);
                self.show_detail_dialog(ctx);
            }
        }

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings {
            server_url: Some(self.server_url.clone()),
            username: Some(self.username.clone()),
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
