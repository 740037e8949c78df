
macro_rules! command_prefix {
    () => ({
        use std::io::Write;
        print!("studymate> ");
        std::io::stdout().flush().expect("Output flush failed");
    });
}
