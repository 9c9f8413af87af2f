use serde::{Deserialize, Serialize};

use crate::value_objects::Timestamp;

/// 广播给状态订阅者的用户状态。
///
/// `status` 除了 "Online"/"Offline" 还承载客户端自定义的
/// 输入状态（例如 "Typing"），因此保持为自由文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub status: String,
    pub last_online: Option<Timestamp>,
}

impl UserStatus {
    pub fn online(now: Timestamp) -> Self {
        Self {
            status: "Online".to_owned(),
            last_online: Some(now),
        }
    }

    pub fn offline(now: Timestamp) -> Self {
        Self {
            status: "Offline".to_owned(),
            last_online: Some(now),
        }
    }
}
