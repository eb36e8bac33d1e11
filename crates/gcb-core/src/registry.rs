use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId},
    Result,
};

/// Port for the per-guild "active channel" binding.
///
/// At most one channel is bound per guild. The application keeps no cached
/// copy: every read goes to the backing store.
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Upsert the binding, replacing any previous channel for the guild.
    async fn set_binding(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    /// Delete the binding. Absent bindings are not an error.
    async fn clear_binding(&self, guild_id: GuildId) -> Result<()>;

    async fn get_binding(&self, guild_id: GuildId) -> Result<Option<ChannelId>>;
}
