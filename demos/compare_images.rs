//! Example showing how to embed and compare two image files

use anyhow::Result;
use vismatch::core::embeddings::{EmbeddingProvider, HistogramProvider};
use vismatch::core::search::cosine_similarity;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the application
    vismatch::init()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: compare_images <image_a> <image_b>");
        std::process::exit(1);
    }

    let provider = HistogramProvider;
    let a = provider.embed(&std::fs::read(&args[1])?).await?;
    let b = provider.embed(&std::fs::read(&args[2])?).await?;

    let similarity = cosine_similarity(&a, &b);
    println!("Similarity between images: {:.2}%", similarity * 100.0);

    Ok(())
}
