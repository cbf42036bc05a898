//! Gateway tests against an in-process mock backend.


mod requests;
