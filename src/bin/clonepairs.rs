use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    clonepairs::apps::run(std::env::args().skip(1))
}
