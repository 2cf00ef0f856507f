mod auth;
mod helpers;
mod log;
mod view;

pub(crate) use auth::{cmd_login, cmd_logout, cmd_whoami};
pub(crate) use log::{cmd_delete, cmd_food, cmd_weight};
pub(crate) use view::{cmd_chart, cmd_history, cmd_show};
