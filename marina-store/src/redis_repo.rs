use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter: true while `key` has been hit at most `limit`
    /// times in the current `window_seconds` window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX starts the window on the first hit only
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET").arg(key).arg(0).arg("EX").arg(window_seconds).arg("NX").ignore()
            .incr(key, 1)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

pub fn intake_rate_key(ip: &str) -> String {
    format!("ratelimit:bookings:{}", ip)
}
