pub fn main() {
    std::process::exit(tabsql::run_with_args(std::env::args_os()));
}
