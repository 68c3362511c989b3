fn main() {
    solominer::main();
}
