fn main() {
    let schema = yaml_flat::options::schema();
    let json = serde_json::to_string_pretty(&schema).expect("schema serialization");
    println!("{json}");
}
