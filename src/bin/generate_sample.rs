use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

/// (region, state, city)
const LOCATIONS: &[(&str, &str, &str)] = &[
    ("East", "New York", "New York City"),
    ("East", "Pennsylvania", "Philadelphia"),
    ("East", "Ohio", "Columbus"),
    ("West", "California", "Los Angeles"),
    ("West", "California", "San Francisco"),
    ("West", "Washington", "Seattle"),
    ("Central", "Texas", "Houston"),
    ("Central", "Illinois", "Chicago"),
    ("South", "Kentucky", "Henderson"),
    ("South", "Florida", "Fort Lauderdale"),
];

/// (category, sub-category, typical unit price)
const PRODUCTS: &[(&str, &str, f64)] = &[
    ("Furniture", "Bookcases", 180.0),
    ("Furniture", "Chairs", 230.0),
    ("Furniture", "Tables", 320.0),
    ("Office Supplies", "Labels", 6.0),
    ("Office Supplies", "Paper", 15.0),
    ("Office Supplies", "Binders", 20.0),
    ("Technology", "Phones", 250.0),
    ("Technology", "Accessories", 60.0),
];

const SEGMENTS: &[&str] = &["Consumer", "Corporate", "Home Office"];

const ROWS: usize = 2_000;

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_sales.csv".to_string());

    let mut rng = SimpleRng::new(42);
    let first_day = NaiveDate::from_ymd_opt(2014, 1, 3).context("invalid start date")?;
    let span_days = 4 * 365;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;

    writer.write_record([
        "Order Date",
        "Region",
        "State",
        "City",
        "Segment",
        "Category",
        "Sub-Category",
        "Sales",
        "Profit",
        "Quantity",
    ])?;

    for _ in 0..ROWS {
        let date = first_day + Duration::days(rng.below(span_days) as i64);
        let &(region, state, city) = rng.pick(LOCATIONS);
        let &(category, sub_category, price) = rng.pick(PRODUCTS);
        let segment = *rng.pick(SEGMENTS);

        let quantity = 1 + rng.below(9);
        let discount = [0.0, 0.1, 0.2, 0.4][rng.below(4)];
        let sales = price * quantity as f64 * (0.6 + 0.8 * rng.next_f64()) * (1.0 - discount);
        let margin = 0.3 - discount - 0.1 * rng.next_f64();
        let profit = sales * margin;

        writer.write_record([
            // Month-first, as in the common Superstore export.
            date.format("%-m/%-d/%Y").to_string(),
            region.to_string(),
            state.to_string(),
            city.to_string(),
            segment.to_string(),
            category.to_string(),
            sub_category.to_string(),
            format!("{sales:.4}"),
            format!("{profit:.4}"),
            quantity.to_string(),
        ])?;
    }
    writer.flush()?;

    println!("Wrote {ROWS} orders to {output_path}");
    Ok(())
}
