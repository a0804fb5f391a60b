use redis::{AsyncCommands, RedisResult};
use tracing::info;
use uuid::Uuid;

/// Redis-backed remaining-capacity counters, for deployments where several
/// nodes take bookings against the same trips.
///
/// The reserve path runs as one Lua script, so the remaining-capacity
/// check and the decrement cannot interleave with another caller.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn capacity_key(trip_id: &Uuid) -> String {
    format!("trip:{}:capacity", trip_id)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Seeds a trip's remaining-capacity counter from the catalog.
    pub async fn seed_capacity(&self, trip_id: &Uuid, available: u32) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(capacity_key(trip_id), available as i64)
            .await?;
        info!("Capacity seeded for trip {}: {}", trip_id, available);
        Ok(())
    }

    pub async fn get_available(&self, trip_id: &Uuid) -> RedisResult<Option<i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(capacity_key(trip_id)).await
    }

    /// Decrements the counter only when it still covers the request.
    /// Returns false when capacity is exhausted or the counter is unseeded;
    /// the caller decides whether to seed and retry.
    pub async fn try_reserve_seats(&self, trip_id: &Uuid, seats: u32) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(
            r#"
            local remaining = redis.call("GET", KEYS[1])
            if not remaining then
                return -1
            end
            if tonumber(remaining) >= tonumber(ARGV[1]) then
                redis.call("DECRBY", KEYS[1], ARGV[1])
                return 1
            end
            return 0
        "#,
        );

        let outcome: i64 = script
            .key(capacity_key(trip_id))
            .arg(seats as i64)
            .invoke_async(&mut conn)
            .await?;
        Ok(outcome == 1)
    }

    /// Returns previously reserved seats to the counter.
    pub async fn release_seats(&self, trip_id: &Uuid, seats: u32) -> RedisResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.incr(capacity_key(trip_id), seats as i64).await
    }

    pub async fn clear_capacity(&self, trip_id: &Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(capacity_key(trip_id)).await
    }
}
