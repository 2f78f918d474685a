//! 打印阴影 PCF 采样用的 GLSL 代码

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 采样点个数
    #[arg(long, default_value_t = 32)]
    count: u32,
}

fn main() {
    let cli = Cli::parse();
    for line in spear_xtask::halton::shadow_sample_lines(cli.count) {
        println!("{line}");
    }
}
