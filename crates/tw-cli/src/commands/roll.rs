use colored::Colorize;
use tw_runtime::RandomSource;

pub fn run(seed: &str, count: u64, from: u64, min: i64, max: i64) -> Result<(), String> {
    let mut random = RandomSource::resume(seed, from);
    println!(
        "  {} {}",
        "Rolling".bold(),
        format!("(seed={seed}, {min}..={max}, starting after draw {from})").dimmed()
    );
    for _ in 0..count {
        let value = random.int(min, max).map_err(|e| e.to_string())?;
        println!("  draw {:>4}  {value}", random.generation());
    }
    Ok(())
}
