use posting_watcher::{registry, Config, Store};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let (Some(name), Some(url)) = (args.next(), args.next()) else {
        eprintln!("Usage: add-site <name> <url> [keywords]");
        std::process::exit(2);
    };
    let keywords = args.next().unwrap_or_default();

    let config = Config::from_env().unwrap();
    let store = Store::connect(&config.database_url).await.unwrap();
    let id = registry::insert_site(store.pool(), &name, &url, &keywords)
        .await
        .unwrap();
    println!("Added site {} ({})", id, name);
    store.close().await;
}
