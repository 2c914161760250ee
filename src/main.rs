use std::process::ExitCode;

fn main() -> ExitCode {
    match ome_xml_model::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
