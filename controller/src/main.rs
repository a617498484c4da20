mod gateway;
mod host;
mod poll;
mod relay;
mod remote_sensor;
mod store;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
