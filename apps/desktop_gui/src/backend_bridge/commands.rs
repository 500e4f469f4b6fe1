//! Backend commands queued from UI to backend worker.

use shared::domain::TaskId;

pub enum BackendCommand {
    Signup {
        server_url: String,
        username: String,
        email: String,
        password: String,
    },
    Login {
        server_url: String,
        username: String,
        password: String,
    },
    ListTasks,
    CreateTask {
        title: String,
    },
    UpdateTask {
        task_id: TaskId,
        title: String,
        completed: bool,
    },
    DeleteTask {
        task_id: TaskId,
    },
}
