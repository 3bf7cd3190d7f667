pub mod resource;
pub mod settings;
pub mod task;
pub mod user;

pub use resource::TaskResource;
pub use settings::{UpdateSettingsRequest, UserSetting};
pub use task::{parse_due_date, Task, TaskInput, TaskUpdate};
pub use user::{Profile, UpdateProfileRequest, User};
