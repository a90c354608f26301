use mongodb::{Client, Database};

pub async fn init_db(uri: &str, db_name: &str) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(uri).await?;

    // Ping the database to verify connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! {"ping": 1})
        .await?;

    log::info!("Successfully connected to MongoDB database '{}'", db_name);

    Ok(client.database(db_name))
}
