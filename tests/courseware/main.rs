mod session;
mod support;
mod transport;
