pub use hubsync_cli::{cli, commands, logging, rest};
pub use hubsync_config as config;
pub use hubsync_core::{
    action_log, dependency, export, files, hub, import, mapping, model, retry, test_utils,
};
