use keldysh_contour::app::run;

fn main() -> color_eyre::Result<()> {
    run()
}
