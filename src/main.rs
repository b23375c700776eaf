use padding_oracle::{
    cbc::decrypt_aes_256_cbc, remove_padding, spawn_server, Attack, AttackConfig, HttpOracle,
    LocalOracle, PaddingCheckHandler, PaddingOracle, QueryMode,
};

use log::LevelFilter;
use simple_logger::SimpleLogger;

use std::error::Error;

const USAGE: &str = "usage: padding_oracle_demo [--http] [--batch <n>]";

struct Args {
    http: bool,
    query_mode: QueryMode,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        http: false,
        query_mode: QueryMode::Sequential,
    };
    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--http" => args.http = true,
            "--batch" => {
                let n = argv
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| format!("--batch needs a number\n{USAGE}"))?;
                args.query_mode = QueryMode::Batched(n);
            }
            other => return Err(format!("unknown argument '{other}'\n{USAGE}")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;
    let args = parse_args()?;
    let config = AttackConfig::default().with_query_mode(args.query_mode);
    let local = LocalOracle::with_rng(&mut rand::thread_rng());

    if args.http {
        let handler = PaddingCheckHandler::new(local.clone());
        let addr = spawn_server("127.0.0.1:0", &handler).await?;
        println!("Attacking padding oracle at {addr}\n");
        run(&local, Attack::new(HttpOracle::new(&addr), config)).await
    } else {
        run(&local, Attack::new(local.clone(), config)).await
    }
}

async fn run<O: PaddingOracle>(
    local: &LocalOracle,
    attack: Attack<O>,
) -> Result<(), Box<dyn Error>> {
    println!("Cracking a Message without IV:");
    let plaintext = b"The quick brown fox jumped over the lazy dog. This is a sample message to decrypt.";
    let ciphertext = local.encrypt(plaintext);
    let decrypted = attack.crack(&ciphertext).await?;
    println!("  Plaintext: {}", String::from_utf8_lossy(plaintext));
    println!(
        "  Decrypted: {}{}",
        " ".repeat(16),
        String::from_utf8_lossy(&remove_padding(&decrypted)?)
    );
    println!();

    println!("Computing IV from known Ciphertext/Plaintext first block");
    let plaintext_2 =
        b"This is some other plaintext where the attacker knows the first plaintext block.";
    let ciphertext_2 = local.encrypt(plaintext_2);
    let computed_iv = attack
        .compute_iv(&ciphertext_2[..16], &plaintext_2[..16])
        .await?;
    println!("  Original IV: {}", hex::encode(local.iv()));
    println!("  Computed IV: {}", hex::encode(&computed_iv));
    println!();

    println!("Cracking a Message with IV:");
    let with_iv = [&computed_iv[..], &ciphertext[..]].concat();
    let decrypted = attack.crack_unpadded(&with_iv).await?;
    println!("  Plaintext:           {}", String::from_utf8_lossy(plaintext));
    println!("  Decrypted (with IV): {}", String::from_utf8_lossy(&decrypted));
    println!();

    println!("Checking coincidental padding is handled");
    let plaintext_3 = [16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2];
    let ciphertext_3 = [&local.iv()[..], &local.encrypt(&plaintext_3)[..]].concat();
    let decrypted = attack.crack_unpadded(&ciphertext_3).await?;
    if decrypted != plaintext_3 {
        return Err("padding collision not handled".into());
    }
    println!("  ok");
    println!();

    println!("Encrypting Arbitrary Data (with chosen IV)");
    let plaintext_4 =
        b"This is a plaintext that an attacker has chosen. They do not need the key to encrypt it.";
    let forgery = attack.encrypt(plaintext_4).await?;
    let iv: [u8; 16] = forgery.iv.as_slice().try_into()?;
    let decrypted = decrypt_aes_256_cbc(&forgery.ciphertext, local.key(), &iv)?;
    println!("  Chosen plaintext:    {}", String::from_utf8_lossy(plaintext_4));
    println!("  Decrypted plaintext: {}", String::from_utf8_lossy(&decrypted));
    println!();

    Ok(())
}
