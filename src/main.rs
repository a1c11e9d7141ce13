use dotenvy::dotenv;
use log::info;

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    dotenv().ok();
    env_logger::init();

    info!("🚀 Collab marketplace API starting");
    info!("📚 Swagger UI → http://localhost:8000/api/docs");

    collabmarket::rocket().launch().await?;
    Ok(())
}
